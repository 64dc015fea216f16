// Copyright 2016 Walter Kuppens.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Instruction semantics. Every mnemonic has one handler that receives the
//! already resolved operand; handlers return any cycles spent on top of the
//! opcode's base count (only branches have such extra cycles).

use nes::addressing::{Operand, Resolved};
use nes::cpu::CPU;
use nes::flags::{self, Flag};
use nes::memory::IRQ_VECTOR;
use nes::opcode::Mnemonic;
use utils::arithmetic;

impl CPU {
    /// Dispatches a decoded instruction to its handler.
    pub(crate) fn execute(&mut self, mnemonic: Mnemonic, resolved: Resolved) -> u8 {
        use nes::opcode::Mnemonic::*;

        let operand = resolved.operand;
        match mnemonic {
            ADC => self.adc(operand),
            AND => self.and(operand),
            ASL => self.asl(operand),
            BCC => return self.bcc(resolved),
            BCS => return self.bcs(resolved),
            BEQ => return self.beq(resolved),
            BIT => self.bit(operand),
            BMI => return self.bmi(resolved),
            BNE => return self.bne(resolved),
            BPL => return self.bpl(resolved),
            BRK => self.brk(),
            BVC => return self.bvc(resolved),
            BVS => return self.bvs(resolved),
            CLC => self.clc(),
            CLD => self.cld(),
            CLI => self.cli(),
            CLV => self.clv(),
            CMP => self.cmp(operand),
            CPX => self.cpx(operand),
            CPY => self.cpy(operand),
            DEC => self.dec(operand),
            DEX => self.dex(),
            DEY => self.dey(),
            EOR => self.eor(operand),
            INC => self.inc(operand),
            INX => self.inx(),
            INY => self.iny(),
            JMP => self.jmp(operand),
            JSR => self.jsr(operand),
            LDA => self.lda(operand),
            LDX => self.ldx(operand),
            LDY => self.ldy(operand),
            LSR => self.lsr(operand),
            NOP => self.nop(),
            ORA => self.ora(operand),
            PHA => self.pha(),
            PHP => self.php(),
            PLA => self.pla(),
            PLP => self.plp(),
            ROL => self.rol(operand),
            ROR => self.ror(operand),
            RTI => self.rti(),
            RTS => self.rts(),
            SBC => self.sbc(operand),
            SEC => self.sec(),
            SED => self.sed(),
            SEI => self.sei(),
            STA => self.sta(operand),
            STX => self.stx(operand),
            STY => self.sty(operand),
            TAX => self.tax(),
            TAY => self.tay(),
            TSX => self.tsx(),
            TXA => self.txa(),
            TXS => self.txs(),
            TYA => self.tya(),
        }
        0
    }

    // Operand plumbing.

    /// Fetches the value an instruction operates on.
    fn load_operand(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Immediate(value) => value,
            Operand::Address(addr) => self.memory.read_u8(addr),
            Operand::Accumulator => self.a,
            Operand::None => unreachable!("instruction without an operand tried to read one"),
        }
    }

    /// Writes the result of a read-modify-write or store back to where the
    /// operand came from.
    fn store_operand(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Address(addr) => self.memory.write_u8(addr, value),
            Operand::Accumulator => self.a = value,
            Operand::Immediate(_) | Operand::None =>
                unreachable!("instruction tried to store into a non-addressable operand"),
        }
    }

    /// Jump targets are always addresses; the opcode table guarantees it.
    fn address_of(operand: Operand) -> u16 {
        match operand {
            Operand::Address(addr) => addr,
            _ => unreachable!("jump or branch without a target address"),
        }
    }

    // Arithmetic.

    /// Adds a value and the carry to the accumulator. Shared by ADC and SBC
    /// since subtraction is addition of the inverted operand.
    fn add_with_carry(&mut self, value: u8) {
        let carry_in = if self.flag(Flag::Carry) { 1 } else { 0 };
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.set_flag(Flag::Carry, sum > 0xFF);
        self.set_flag(Flag::Overflow, arithmetic::signed_overflow(self.a, value, result));
        self.update_zero_and_negative(result);
        self.a = result;
    }

    /// ADC - Add with Carry
    fn adc(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        self.add_with_carry(value);
    }

    /// SBC - Subtract with Carry. A clear carry means a borrow is pending.
    fn sbc(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        self.add_with_carry(!value);
    }

    // Logical.

    /// AND - Logical AND
    fn and(&mut self, operand: Operand) {
        let result = self.a & self.load_operand(operand);
        self.a = result;
        self.update_zero_and_negative(result);
    }

    /// ORA - Logical Inclusive OR
    fn ora(&mut self, operand: Operand) {
        let result = self.a | self.load_operand(operand);
        self.a = result;
        self.update_zero_and_negative(result);
    }

    /// EOR - Exclusive OR
    fn eor(&mut self, operand: Operand) {
        let result = self.a ^ self.load_operand(operand);
        self.a = result;
        self.update_zero_and_negative(result);
    }

    /// BIT - Bit Test. Bits 6 and 7 of the operand are copied into overflow
    /// and negative; the accumulator is only used for the zero test.
    fn bit(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        let a = self.a;
        self.set_flag(Flag::Zero, a & value == 0);
        self.set_flag(Flag::Overflow, value & flags::OVERFLOW_FLAG != 0);
        self.set_flag(Flag::Negative, value & flags::NEGATIVE_FLAG != 0);
    }

    // Shifts and rotates.

    /// ASL - Arithmetic Shift Left
    fn asl(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        let result = value << 1;
        self.set_flag(Flag::Carry, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        self.store_operand(operand, result);
    }

    /// LSR - Logical Shift Right
    fn lsr(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        let result = value >> 1;
        self.set_flag(Flag::Carry, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        self.store_operand(operand, result);
    }

    /// ROL - Rotate Left through the carry.
    fn rol(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        let carry_in = if self.flag(Flag::Carry) { 0x01 } else { 0 };
        let result = (value << 1) | carry_in;
        self.set_flag(Flag::Carry, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        self.store_operand(operand, result);
    }

    /// ROR - Rotate Right through the carry.
    fn ror(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        let carry_in = if self.flag(Flag::Carry) { 0x80 } else { 0 };
        let result = (value >> 1) | carry_in;
        self.set_flag(Flag::Carry, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        self.store_operand(operand, result);
    }

    // Comparisons.

    /// Compares a register against the operand as if subtracting it.
    fn compare(&mut self, register: u8, operand: Operand) {
        let value = self.load_operand(operand);
        let result = register.wrapping_sub(value);
        self.set_flag(Flag::Carry, register >= value);
        self.update_zero_and_negative(result);
    }

    /// CMP - Compare Accumulator
    fn cmp(&mut self, operand: Operand) {
        let a = self.a;
        self.compare(a, operand);
    }

    /// CPX - Compare X Register
    fn cpx(&mut self, operand: Operand) {
        let x = self.x;
        self.compare(x, operand);
    }

    /// CPY - Compare Y Register
    fn cpy(&mut self, operand: Operand) {
        let y = self.y;
        self.compare(y, operand);
    }

    // Increments and decrements.

    /// INC - Increment Memory
    fn inc(&mut self, operand: Operand) {
        let result = self.load_operand(operand).wrapping_add(1);
        self.store_operand(operand, result);
        self.update_zero_and_negative(result);
    }

    /// DEC - Decrement Memory
    fn dec(&mut self, operand: Operand) {
        let result = self.load_operand(operand).wrapping_sub(1);
        self.store_operand(operand, result);
        self.update_zero_and_negative(result);
    }

    /// INX - Increment X Register
    fn inx(&mut self) {
        self.x = self.x.wrapping_add(1);
        let x = self.x;
        self.update_zero_and_negative(x);
    }

    /// INY - Increment Y Register
    fn iny(&mut self) {
        self.y = self.y.wrapping_add(1);
        let y = self.y;
        self.update_zero_and_negative(y);
    }

    /// DEX - Decrement X Register
    fn dex(&mut self) {
        self.x = self.x.wrapping_sub(1);
        let x = self.x;
        self.update_zero_and_negative(x);
    }

    /// DEY - Decrement Y Register
    fn dey(&mut self) {
        self.y = self.y.wrapping_sub(1);
        let y = self.y;
        self.update_zero_and_negative(y);
    }

    // Loads and stores.

    /// LDA - Load Accumulator
    fn lda(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        self.a = value;
        self.update_zero_and_negative(value);
    }

    /// LDX - Load X Register
    fn ldx(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        self.x = value;
        self.update_zero_and_negative(value);
    }

    /// LDY - Load Y Register
    fn ldy(&mut self, operand: Operand) {
        let value = self.load_operand(operand);
        self.y = value;
        self.update_zero_and_negative(value);
    }

    /// STA - Store Accumulator
    fn sta(&mut self, operand: Operand) {
        let a = self.a;
        self.store_operand(operand, a);
    }

    /// STX - Store X Register
    fn stx(&mut self, operand: Operand) {
        let x = self.x;
        self.store_operand(operand, x);
    }

    /// STY - Store Y Register
    fn sty(&mut self, operand: Operand) {
        let y = self.y;
        self.store_operand(operand, y);
    }

    // Register transfers.

    /// TAX - Transfer Accumulator to X
    fn tax(&mut self) {
        self.x = self.a;
        let x = self.x;
        self.update_zero_and_negative(x);
    }

    /// TAY - Transfer Accumulator to Y
    fn tay(&mut self) {
        self.y = self.a;
        let y = self.y;
        self.update_zero_and_negative(y);
    }

    /// TXA - Transfer X to Accumulator
    fn txa(&mut self) {
        self.a = self.x;
        let a = self.a;
        self.update_zero_and_negative(a);
    }

    /// TYA - Transfer Y to Accumulator
    fn tya(&mut self) {
        self.a = self.y;
        let a = self.a;
        self.update_zero_and_negative(a);
    }

    /// TSX - Transfer Stack Pointer to X
    fn tsx(&mut self) {
        self.x = self.sp;
        let x = self.x;
        self.update_zero_and_negative(x);
    }

    /// TXS - Transfer X to Stack Pointer. The only transfer that leaves the
    /// flags alone.
    fn txs(&mut self) {
        self.sp = self.x;
    }

    // Stack operations.

    /// PHA - Push Accumulator
    fn pha(&mut self) {
        let a = self.a;
        self.stack_push_u8(a);
    }

    /// PHP - Push Processor Status. The pushed copy has break set.
    fn php(&mut self) {
        let status = flags::pushed_status(self.p, true);
        self.stack_push_u8(status);
    }

    /// PLA - Pull Accumulator
    fn pla(&mut self) {
        let value = self.stack_pop_u8();
        self.a = value;
        self.update_zero_and_negative(value);
    }

    /// PLP - Pull Processor Status
    fn plp(&mut self) {
        let value = self.stack_pop_u8();
        self.p = flags::pulled_status(value);
    }

    // Jumps and subroutines.

    /// JMP - Jump
    fn jmp(&mut self, operand: Operand) {
        self.pc = CPU::address_of(operand);
    }

    /// JSR - Jump to Subroutine. Pushes the address of the last byte of the
    /// JSR instruction, one less than the return address.
    fn jsr(&mut self, operand: Operand) {
        let target = CPU::address_of(operand);
        let ret = self.pc.wrapping_sub(1);
        self.stack_push_u16(ret);
        self.pc = target;
    }

    /// RTS - Return from Subroutine
    fn rts(&mut self) {
        self.pc = self.stack_pop_u16().wrapping_add(1);
    }

    /// BRK - Force Interrupt. The byte after the opcode is padding and is
    /// skipped by the pushed return address.
    fn brk(&mut self) {
        self.pc = self.pc.wrapping_add(1);
        self.enter_interrupt(IRQ_VECTOR, true);
    }

    /// RTI - Return from Interrupt
    fn rti(&mut self) {
        let status = self.stack_pop_u8();
        self.p = flags::pulled_status(status);
        self.pc = self.stack_pop_u16();
    }

    // Branches.

    /// Moves to the branch target if the condition holds. A taken branch
    /// costs one cycle, and one more if the target is on another page.
    fn branch(&mut self, condition: bool, resolved: Resolved) -> u8 {
        if !condition {
            return 0;
        }
        self.pc = CPU::address_of(resolved.operand);
        if resolved.page_crossed { 2 } else { 1 }
    }

    /// BCC - Branch if Carry Clear
    fn bcc(&mut self, resolved: Resolved) -> u8 {
        let condition = !self.flag(Flag::Carry);
        self.branch(condition, resolved)
    }

    /// BCS - Branch if Carry Set
    fn bcs(&mut self, resolved: Resolved) -> u8 {
        let condition = self.flag(Flag::Carry);
        self.branch(condition, resolved)
    }

    /// BEQ - Branch if Equal
    fn beq(&mut self, resolved: Resolved) -> u8 {
        let condition = self.flag(Flag::Zero);
        self.branch(condition, resolved)
    }

    /// BNE - Branch if Not Equal
    fn bne(&mut self, resolved: Resolved) -> u8 {
        let condition = !self.flag(Flag::Zero);
        self.branch(condition, resolved)
    }

    /// BMI - Branch if Minus
    fn bmi(&mut self, resolved: Resolved) -> u8 {
        let condition = self.flag(Flag::Negative);
        self.branch(condition, resolved)
    }

    /// BPL - Branch if Positive
    fn bpl(&mut self, resolved: Resolved) -> u8 {
        let condition = !self.flag(Flag::Negative);
        self.branch(condition, resolved)
    }

    /// BVC - Branch if Overflow Clear
    fn bvc(&mut self, resolved: Resolved) -> u8 {
        let condition = !self.flag(Flag::Overflow);
        self.branch(condition, resolved)
    }

    /// BVS - Branch if Overflow Set
    fn bvs(&mut self, resolved: Resolved) -> u8 {
        let condition = self.flag(Flag::Overflow);
        self.branch(condition, resolved)
    }

    // Status flag changes.

    /// CLC - Clear Carry Flag
    fn clc(&mut self) {
        self.set_flag(Flag::Carry, false);
    }

    /// SEC - Set Carry Flag
    fn sec(&mut self) {
        self.set_flag(Flag::Carry, true);
    }

    /// CLD - Clear Decimal Mode
    fn cld(&mut self) {
        self.set_flag(Flag::Decimal, false);
    }

    /// SED - Set Decimal Flag. Stored but ignored by the 2A03's adder.
    fn sed(&mut self) {
        self.set_flag(Flag::Decimal, true);
    }

    /// CLI - Clear Interrupt Disable
    fn cli(&mut self) {
        self.set_flag(Flag::InterruptDisable, false);
    }

    /// SEI - Set Interrupt Disable
    fn sei(&mut self) {
        self.set_flag(Flag::InterruptDisable, true);
    }

    /// CLV - Clear Overflow Flag
    fn clv(&mut self) {
        self.set_flag(Flag::Overflow, false);
    }

    /// NOP - No Operation
    fn nop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use nes::cpu::CPU;
    use nes::flags::{Flag, BREAK_COMMAND, CARRY_FLAG, NEGATIVE_FLAG, OVERFLOW_FLAG, UNUSED_FLAG, ZERO_FLAG};

    /// Loads a program at 0x8000 and points the program counter at it.
    fn cpu_with(program: &[u8]) -> CPU {
        let mut cpu = CPU::new();
        cpu.load(0x8000, program);
        cpu.pc = 0x8000;
        cpu
    }

    fn run(cpu: &mut CPU, steps: usize) {
        for _ in 0..steps {
            cpu.step().unwrap();
        }
    }

    #[test]
    fn adc_signed_overflow() {
        let mut cpu = cpu_with(&[0x69, 0x01]); // ADC #$01
        cpu.a = 0x7F;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x80);
        assert!(cpu.flag(Flag::Overflow));
        assert!(cpu.flag(Flag::Negative));
        assert!(!cpu.flag(Flag::Carry));
        assert!(!cpu.flag(Flag::Zero));
    }

    #[test]
    fn adc_carry_out_and_zero() {
        let mut cpu = cpu_with(&[0x69, 0x01]);
        cpu.a = 0xFF;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x00);
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Zero));
        assert!(!cpu.flag(Flag::Overflow));
    }

    #[test]
    fn adc_uses_carry_in() {
        let mut cpu = cpu_with(&[0x38, 0x69, 0x10]); // SEC; ADC #$10
        cpu.a = 0x20;
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x31);
        assert!(!cpu.flag(Flag::Carry));
    }

    #[test]
    fn adc_negative_overflow() {
        let mut cpu = cpu_with(&[0x69, 0x80]);
        cpu.a = 0x80;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x00);
        assert!(cpu.flag(Flag::Overflow));
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Zero));
    }

    #[test]
    fn sbc_borrows() {
        let mut cpu = cpu_with(&[0x38, 0xE9, 0x01]); // SEC; SBC #$01
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0xFF);
        assert!(!cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Negative));
        assert!(!cpu.flag(Flag::Overflow));
    }

    #[test]
    fn sbc_without_carry_subtracts_one_more() {
        let mut cpu = cpu_with(&[0x18, 0xE9, 0x01]); // CLC; SBC #$01
        cpu.a = 0x05;
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x03);
        assert!(cpu.flag(Flag::Carry));
    }

    #[test]
    fn sbc_signed_overflow() {
        let mut cpu = cpu_with(&[0x38, 0xE9, 0x01]);
        cpu.a = 0x80;
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x7F);
        assert!(cpu.flag(Flag::Overflow));
        assert!(cpu.flag(Flag::Carry));
    }

    #[test]
    fn decimal_flag_does_not_change_arithmetic() {
        let mut cpu = cpu_with(&[0xF8, 0x69, 0x01]); // SED; ADC #$01
        cpu.a = 0x09;
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x0A);
        assert!(cpu.flag(Flag::Decimal));
    }

    #[test]
    fn logical_operations() {
        let mut cpu = cpu_with(&[
            0x29, 0x0F, // AND #$0F
            0x09, 0x80, // ORA #$80
            0x49, 0x8F, // EOR #$8F
        ]);
        cpu.a = 0x3C;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x0C);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x8C);
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x03);
        assert!(!cpu.flag(Flag::Negative));
        assert!(!cpu.flag(Flag::Zero));
    }

    #[test]
    fn bit_copies_high_bits_and_keeps_accumulator() {
        let mut cpu = cpu_with(&[0x24, 0x10]); // BIT $10
        cpu.write(0x0010, 0xC0);
        cpu.a = 0x01;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x01);
        assert!(cpu.flag(Flag::Zero));
        assert!(cpu.flag(Flag::Overflow));
        assert!(cpu.flag(Flag::Negative));
    }

    #[test]
    fn bit_clears_flags_from_operand() {
        let mut cpu = cpu_with(&[0x2C, 0x00, 0x03]); // BIT $0300
        cpu.write(0x0300, 0x01);
        cpu.a = 0x01;
        cpu.p |= OVERFLOW_FLAG | NEGATIVE_FLAG | ZERO_FLAG;
        run(&mut cpu, 1);
        assert!(!cpu.flag(Flag::Zero));
        assert!(!cpu.flag(Flag::Overflow));
        assert!(!cpu.flag(Flag::Negative));
    }

    #[test]
    fn asl_accumulator_and_memory() {
        let mut cpu = cpu_with(&[0x0A, 0x06, 0x20]); // ASL A; ASL $20
        cpu.a = 0x81;
        cpu.write(0x0020, 0x40);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x02);
        assert!(cpu.flag(Flag::Carry));
        run(&mut cpu, 1);
        assert_eq!(cpu.read(0x0020), 0x80);
        assert!(!cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Negative));
    }

    #[test]
    fn lsr_shifts_into_carry() {
        let mut cpu = cpu_with(&[0x4A]); // LSR A
        cpu.a = 0x01;
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x00);
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Zero));
        assert!(!cpu.flag(Flag::Negative));
    }

    #[test]
    fn rotates_feed_carry_through() {
        let mut cpu = cpu_with(&[0x38, 0x2A, 0x6A, 0x6A]); // SEC; ROL A; ROR A; ROR A
        cpu.a = 0x80;
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x01);
        assert!(cpu.flag(Flag::Carry));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x80);
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0xC0);
        assert!(!cpu.flag(Flag::Carry));
    }

    #[test]
    fn rotate_memory_in_place() {
        let mut cpu = cpu_with(&[0x18, 0x2E, 0x00, 0x04]); // CLC; ROL $0400
        cpu.write(0x0400, 0x80);
        run(&mut cpu, 2);
        assert_eq!(cpu.read(0x0400), 0x00);
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Zero));
    }

    #[test]
    fn compares_set_carry_zero_negative() {
        let mut cpu = cpu_with(&[
            0xC9, 0x10, // CMP #$10
            0xE0, 0x20, // CPX #$20
            0xC0, 0x01, // CPY #$01
        ]);
        cpu.a = 0x10;
        cpu.x = 0x10;
        cpu.y = 0x02;
        run(&mut cpu, 1);
        assert!(cpu.flag(Flag::Carry));
        assert!(cpu.flag(Flag::Zero));
        assert!(!cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert!(!cpu.flag(Flag::Carry));
        assert!(!cpu.flag(Flag::Zero));
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert!(cpu.flag(Flag::Carry));
        assert!(!cpu.flag(Flag::Zero));
        assert_eq!(cpu.a, 0x10);
    }

    #[test]
    fn increments_wrap() {
        let mut cpu = cpu_with(&[0xE6, 0x10, 0xC6, 0x11, 0xE8, 0x88]); // INC $10; DEC $11; INX; DEY
        cpu.write(0x0010, 0xFF);
        cpu.x = 0x7F;
        run(&mut cpu, 1);
        assert_eq!(cpu.read(0x0010), 0x00);
        assert!(cpu.flag(Flag::Zero));
        run(&mut cpu, 1);
        assert_eq!(cpu.read(0x0011), 0xFF);
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert_eq!(cpu.x, 0x80);
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert_eq!(cpu.y, 0xFF);
    }

    #[test]
    fn increments_leave_carry_alone() {
        let mut cpu = cpu_with(&[0x38, 0xC8, 0xCA]); // SEC; INY; DEX
        run(&mut cpu, 3);
        assert!(cpu.flag(Flag::Carry));
        assert_eq!(cpu.y, 0x01);
        assert_eq!(cpu.x, 0xFF);
    }

    #[test]
    fn loads_and_stores() {
        let mut cpu = cpu_with(&[
            0xA9, 0x00,       // LDA #$00
            0xA2, 0x80,       // LDX #$80
            0xA0, 0x05,       // LDY #$05
            0x8D, 0x00, 0x02, // STA $0200
            0x86, 0x10,       // STX $10
            0x8C, 0x01, 0x02, // STY $0201
        ]);
        run(&mut cpu, 1);
        assert!(cpu.flag(Flag::Zero));
        run(&mut cpu, 1);
        assert!(cpu.flag(Flag::Negative));
        assert!(!cpu.flag(Flag::Zero));
        run(&mut cpu, 1);
        let status = cpu.p;
        run(&mut cpu, 3);
        assert_eq!(cpu.p, status);
        assert_eq!(cpu.read(0x0200), 0x00);
        assert_eq!(cpu.read(0x0010), 0x80);
        assert_eq!(cpu.read(0x0201), 0x05);
    }

    #[test]
    fn store_to_ppu_window_lands_in_memory() {
        let mut cpu = cpu_with(&[0xA9, 0x1E, 0x8D, 0x01, 0x20]); // LDA #$1E; STA $2001
        run(&mut cpu, 2);
        assert_eq!(cpu.read(0x2001), 0x1E);
    }

    #[test]
    fn transfers() {
        let mut cpu = cpu_with(&[0xAA, 0xA8, 0xBA, 0x8A, 0x98]); // TAX; TAY; TSX; TXA; TYA
        cpu.a = 0x00;
        run(&mut cpu, 1);
        assert!(cpu.flag(Flag::Zero));
        cpu.a = 0x90;
        run(&mut cpu, 1);
        assert_eq!(cpu.y, 0x90);
        assert!(cpu.flag(Flag::Negative));
        run(&mut cpu, 1);
        assert_eq!(cpu.x, 0xFF);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0xFF);
        run(&mut cpu, 1);
        assert_eq!(cpu.a, 0x90);
    }

    #[test]
    fn txs_touches_no_flags() {
        let mut cpu = cpu_with(&[0xA2, 0x00, 0x9A]); // LDX #$00; TXS
        run(&mut cpu, 1);
        cpu.p &= !ZERO_FLAG;
        run(&mut cpu, 1);
        assert_eq!(cpu.sp, 0x00);
        assert!(!cpu.flag(Flag::Zero));
    }

    #[test]
    fn pha_pla_round_trip() {
        let mut cpu = cpu_with(&[0x48, 0xA9, 0x00, 0x68]); // PHA; LDA #$00; PLA
        cpu.a = 0x42;
        run(&mut cpu, 1);
        assert_eq!(cpu.sp, 0xFE);
        assert_eq!(cpu.read(0x01FF), 0x42);
        run(&mut cpu, 2);
        assert_eq!(cpu.a, 0x42);
        assert_eq!(cpu.sp, 0xFF);
        assert!(!cpu.flag(Flag::Zero));
    }

    #[test]
    fn php_plp_round_trip() {
        let mut cpu = cpu_with(&[0x08, 0x18, 0xB8, 0x28]); // PHP; CLC; CLV; PLP
        cpu.p = UNUSED_FLAG | CARRY_FLAG | OVERFLOW_FLAG;
        let before = cpu.p;
        run(&mut cpu, 1);
        assert_eq!(cpu.read(0x01FF), before | BREAK_COMMAND);
        run(&mut cpu, 3);
        assert_eq!(cpu.p, before);
        assert_eq!(cpu.sp, 0xFF);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = cpu_with(&[0x20, 0x00, 0x90]); // JSR $9000
        cpu.write(0x9000, 0x60); // RTS
        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x9000);
        assert_eq!(cpu.read(0x01FF), 0x80);
        assert_eq!(cpu.read(0x01FE), 0x02);
        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(cpu.sp, 0xFF);
    }

    #[test]
    fn jmp_absolute_and_indirect() {
        let mut cpu = cpu_with(&[0x4C, 0x00, 0x90]); // JMP $9000
        cpu.load(0x9000, &[0x6C, 0xFF, 0x02]); // JMP ($02FF)
        cpu.write(0x02FF, 0x34);
        cpu.write(0x0200, 0x12);
        cpu.write(0x0300, 0x56);
        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x9000);
        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x1234);
    }

    #[test]
    fn brk_rti_round_trip() {
        let mut cpu = cpu_with(&[0x00, 0xEA]); // BRK; padding
        cpu.load(0xFFFE, &[0x00, 0x90]);
        cpu.write(0x9000, 0x40); // RTI
        cpu.p = UNUSED_FLAG | CARRY_FLAG | NEGATIVE_FLAG;
        let status = cpu.p;

        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x9000);
        assert!(cpu.flag(Flag::InterruptDisable));
        assert!(!cpu.flag(Flag::Break));
        assert_eq!(cpu.read(0x01FD), status | BREAK_COMMAND);

        run(&mut cpu, 1);
        assert_eq!(cpu.pc, 0x8002);
        assert_eq!(cpu.p, status);
        assert_eq!(cpu.sp, 0xFF);
    }

    #[test]
    fn branch_taken_and_not_taken() {
        let mut cpu = CPU::new();
        cpu.load(0x8010, &[0xF0, 0x05]); // BEQ +5
        cpu.pc = 0x8010;
        cpu.p |= ZERO_FLAG;
        assert_eq!(cpu.step().unwrap(), 3);
        assert_eq!(cpu.pc, 0x8017);

        cpu.pc = 0x8010;
        cpu.p &= !ZERO_FLAG;
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.pc, 0x8012);
    }

    #[test]
    fn branch_backwards_across_page() {
        let mut cpu = CPU::new();
        cpu.load(0x8000, &[0xD0, 0xFC]); // BNE -4
        cpu.pc = 0x8000;
        assert_eq!(cpu.step().unwrap(), 4);
        assert_eq!(cpu.pc, 0x7FFE);
    }

    #[test]
    fn each_branch_tests_its_flag() {
        // (opcode, flag mask, branch when set)
        let cases = [
            (0x90, CARRY_FLAG, false),
            (0xB0, CARRY_FLAG, true),
            (0xF0, ZERO_FLAG, true),
            (0xD0, ZERO_FLAG, false),
            (0x30, NEGATIVE_FLAG, true),
            (0x10, NEGATIVE_FLAG, false),
            (0x50, OVERFLOW_FLAG, false),
            (0x70, OVERFLOW_FLAG, true),
        ];
        for &(opcode, mask, when_set) in cases.iter() {
            for &set in [true, false].iter() {
                let mut cpu = cpu_with(&[opcode, 0x10]);
                if set {
                    cpu.p |= mask;
                }
                run(&mut cpu, 1);
                let expected = if set == when_set { 0x8012 } else { 0x8002 };
                assert_eq!(cpu.pc, expected, "opcode {:02X} with flag set={}", opcode, set);
            }
        }
    }

    #[test]
    fn flag_instructions_touch_one_flag() {
        let mut cpu = cpu_with(&[0x38, 0xF8, 0x78, 0x18, 0xD8, 0x58, 0xB8]);
        run(&mut cpu, 3);
        assert_eq!(cpu.p, UNUSED_FLAG | CARRY_FLAG | 0x08 | 0x04);
        run(&mut cpu, 3);
        assert_eq!(cpu.p, UNUSED_FLAG);
        cpu.p |= OVERFLOW_FLAG;
        run(&mut cpu, 1);
        assert_eq!(cpu.p, UNUSED_FLAG);
    }

    #[test]
    fn nop_only_advances_past_itself() {
        let mut cpu = cpu_with(&[0xEA]);
        let p = cpu.p;
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.pc, 0x8001);
        assert_eq!(cpu.p, p);
        assert_eq!(cpu.a, 0);
    }

    #[test]
    fn indexed_reads_pay_for_page_crossing() {
        let mut cpu = cpu_with(&[0xBD, 0xFF, 0x20, 0xBD, 0x00, 0x20]); // LDA $20FF,X; LDA $2000,X
        cpu.x = 0x01;
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.step().unwrap(), 4);
    }

    #[test]
    fn indexed_stores_have_fixed_cost() {
        let mut cpu = cpu_with(&[0x9D, 0xFF, 0x20]); // STA $20FF,X
        cpu.x = 0x01;
        cpu.a = 0x77;
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.read(0x2100), 0x77);
    }

    #[test]
    fn indirect_y_load() {
        let mut cpu = cpu_with(&[0xB1, 0x40]); // LDA ($40),Y
        cpu.write(0x0040, 0xF0);
        cpu.write(0x0041, 0x03);
        cpu.write(0x0405, 0x99);
        cpu.y = 0x15;
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.a, 0x99);
    }

    #[test]
    fn indirect_x_store() {
        let mut cpu = cpu_with(&[0x81, 0x3E]); // STA ($3E,X)
        cpu.write(0x0040, 0x00);
        cpu.write(0x0041, 0x05);
        cpu.x = 0x02;
        cpu.a = 0x5A;
        run(&mut cpu, 1);
        assert_eq!(cpu.read(0x0500), 0x5A);
    }
}
