//! The 52 x86-64 GPR views (§4.4), laid out as four contiguous rows of 13:
//! 64-bit, 32-bit, 16-bit, 8-bit, in the same column order within each row.
//!
//! Grounded on `original_source/src/includes/Generator/Registers.cpp`:
//! `RAX,RCX,RDX,RSI,RDI,R8..R15` — `RBX`/`RBP`/`RSP` are deliberately absent
//! since the original reserves them for the frame/stack pointer and callee-
//! saved bookkeeping rather than general allocation.

use slate_util::diagnostic::Handler;

pub const BLOCK_WIDTH: usize = 13;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    Rax, Rcx, Rdx, Rsi, Rdi, R8, R9, R10, R11, R12, R13, R14, R15,
    Eax, Ecx, Edx, Esi, Edi, R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,
    Ax, Cx, Dx, Si, Di, R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,
    Al, Cl, Dl, Sil, Dil, R8b, R9b, R10b, R11b, R12b, R13b, R14b, R15b,
}

impl Register {
    fn index(self) -> usize {
        self as usize
    }

    fn row(self) -> usize {
        self.index() / BLOCK_WIDTH
    }

    fn at(index: usize) -> Register {
        const TABLE: [Register; 52] = [
            Register::Rax, Register::Rcx, Register::Rdx, Register::Rsi, Register::Rdi,
            Register::R8, Register::R9, Register::R10, Register::R11, Register::R12,
            Register::R13, Register::R14, Register::R15,
            Register::Eax, Register::Ecx, Register::Edx, Register::Esi, Register::Edi,
            Register::R8d, Register::R9d, Register::R10d, Register::R11d, Register::R12d,
            Register::R13d, Register::R14d, Register::R15d,
            Register::Ax, Register::Cx, Register::Dx, Register::Si, Register::Di,
            Register::R8w, Register::R9w, Register::R10w, Register::R11w, Register::R12w,
            Register::R13w, Register::R14w, Register::R15w,
            Register::Al, Register::Cl, Register::Dl, Register::Sil, Register::Dil,
            Register::R8b, Register::R9b, Register::R10b, Register::R11b, Register::R12b,
            Register::R13b, Register::R14b, Register::R15b,
        ];
        TABLE[index]
    }

    fn convert_to(self, row: usize) -> Register {
        if self.row() == row {
            return self;
        }
        Register::at((self.index() % BLOCK_WIDTH) + row * BLOCK_WIDTH)
    }

    pub fn to64(self) -> Register {
        self.convert_to(0)
    }
    pub fn to32(self) -> Register {
        self.convert_to(1)
    }
    pub fn to16(self) -> Register {
        self.convert_to(2)
    }
    pub fn to08(self) -> Register {
        self.convert_to(3)
    }

    /// Moves to the next wider row. Already at the widest row warns through
    /// `handler` and returns `self` unchanged, matching
    /// `original_source`'s `Errors::warn("Register already 64bit")` rather
    /// than a hard error.
    pub fn promote(self, handler: &mut Handler, line: u32) -> Register {
        match self.row() {
            0 => {
                handler.warn(line, "Register already 64bit");
                self
            }
            1 => self.to64(),
            2 => self.to32(),
            3 => self.to16(),
            _ => unreachable!("register row is always 0..4"),
        }
    }

    /// Moves to the next narrower row; the 8-bit row warns and returns
    /// `self` unchanged, the mirror image of `promote`.
    pub fn demote(self, handler: &mut Handler, line: u32) -> Register {
        match self.row() {
            0 => self.to32(),
            1 => self.to16(),
            2 => self.to08(),
            3 => {
                handler.warn(line, "Register already 8bit");
                self
            }
            _ => unreachable!("register row is always 0..4"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Rax => "rax", Register::Rcx => "rcx", Register::Rdx => "rdx",
            Register::Rsi => "rsi", Register::Rdi => "rdi",
            Register::R8 => "r8", Register::R9 => "r9", Register::R10 => "r10",
            Register::R11 => "r11", Register::R12 => "r12", Register::R13 => "r13",
            Register::R14 => "r14", Register::R15 => "r15",
            Register::Eax => "eax", Register::Ecx => "ecx", Register::Edx => "edx",
            Register::Esi => "esi", Register::Edi => "edi",
            Register::R8d => "r8d", Register::R9d => "r9d", Register::R10d => "r10d",
            Register::R11d => "r11d", Register::R12d => "r12d", Register::R13d => "r13d",
            Register::R14d => "r14d", Register::R15d => "r15d",
            Register::Ax => "ax", Register::Cx => "cx", Register::Dx => "dx",
            Register::Si => "si", Register::Di => "di",
            Register::R8w => "r8w", Register::R9w => "r9w", Register::R10w => "r10w",
            Register::R11w => "r11w", Register::R12w => "r12w", Register::R13w => "r13w",
            Register::R14w => "r14w", Register::R15w => "r15w",
            Register::Al => "al", Register::Cl => "cl", Register::Dl => "dl",
            Register::Sil => "sil", Register::Dil => "dil",
            Register::R8b => "r8b", Register::R9b => "r9b", Register::R10b => "r10b",
            Register::R11b => "r11b", Register::R12b => "r12b", Register::R13b => "r13b",
            Register::R14b => "r14b", Register::R15b => "r15b",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_round_trip() {
        let r = Register::Rax;
        assert_eq!(r.to64().to32().to16().to08().to64(), r.to64());
    }

    #[test]
    fn to32_changes_row_keeps_column() {
        assert_eq!(Register::Rdi.to32(), Register::Edi);
        assert_eq!(Register::R10.to08(), Register::R10b);
    }

    #[test]
    fn promote_past_64bit_warns_and_stays() {
        let mut handler = Handler::new();
        let r = Register::Rsi.promote(&mut handler, 1);
        assert_eq!(r, Register::Rsi);
        assert!(!handler.is_empty());
    }

    #[test]
    fn demote_past_8bit_warns_and_stays() {
        let mut handler = Handler::new();
        let r = Register::Sil.demote(&mut handler, 1);
        assert_eq!(r, Register::Sil);
        assert!(!handler.is_empty());
    }

    #[test]
    fn demote_promote_are_inverse_in_middle_rows() {
        let mut handler = Handler::new();
        let r = Register::Edi.promote(&mut handler, 1).demote(&mut handler, 1);
        assert_eq!(r, Register::Edi);
        assert!(handler.is_empty());
    }
}
