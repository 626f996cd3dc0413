//! x86 general-purpose registers and register masks.
//!
//! Register numbers follow the hardware encoding used in ModRM and opcode
//! low bits, so bit `k` of a [`RegisterMask`] is the register whose encoding
//! is `k`. Sub-registers (`al`, `ax`, `r8d`, ...) resolve to the register
//! they are part of.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::RegisterError;

/// General-purpose register, numbered by its x86 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    Eax = 0,
    Ecx = 1,
    Edx = 2,
    Ebx = 3,
    Esp = 4,
    Ebp = 5,
    Esi = 6,
    Edi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Register {
    /// All registers in encoding order.
    pub const ALL: [Register; 16] = [
        Register::Eax,
        Register::Ecx,
        Register::Edx,
        Register::Ebx,
        Register::Esp,
        Register::Ebp,
        Register::Esi,
        Register::Edi,
        Register::R8,
        Register::R9,
        Register::R10,
        Register::R11,
        Register::R12,
        Register::R13,
        Register::R14,
        Register::R15,
    ];

    /// Register encoding (0-15).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Canonical 32-bit name.
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Every accepted spelling, canonical name first.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Register::Eax => &["eax", "rax", "ax", "al", "ah"],
            Register::Ecx => &["ecx", "rcx", "cx", "cl", "ch"],
            Register::Edx => &["edx", "rdx", "dx", "dl", "dh"],
            Register::Ebx => &["ebx", "rbx", "bx", "bl", "bh"],
            Register::Esp => &["esp", "rsp", "sp", "spl"],
            Register::Ebp => &["ebp", "rbp", "bp", "bpl"],
            Register::Esi => &["esi", "rsi", "si", "sil"],
            Register::Edi => &["edi", "rdi", "di", "dil"],
            Register::R8 => &["r8d", "r8", "r8w", "r8b", "r8l"],
            Register::R9 => &["r9d", "r9", "r9w", "r9b", "r9l"],
            Register::R10 => &["r10d", "r10", "r10w", "r10b", "r10l"],
            Register::R11 => &["r11d", "r11", "r11w", "r11b", "r11l"],
            Register::R12 => &["r12d", "r12", "r12w", "r12b", "r12l"],
            Register::R13 => &["r13d", "r13", "r13w", "r13b", "r13l"],
            Register::R14 => &["r14d", "r14", "r14w", "r14b", "r14l"],
            Register::R15 => &["r15d", "r15", "r15w", "r15b", "r15l"],
        }
    }

    /// Map an iced-x86 register onto the GPR it belongs to.
    ///
    /// Segment, control, vector and flag registers have no slot in the
    /// candidate mask and return `None`.
    pub fn from_iced(reg: iced_x86::Register) -> Option<Register> {
        use iced_x86::Register as R;
        let gpr = match reg {
            R::RAX | R::EAX | R::AX | R::AL | R::AH => Register::Eax,
            R::RCX | R::ECX | R::CX | R::CL | R::CH => Register::Ecx,
            R::RDX | R::EDX | R::DX | R::DL | R::DH => Register::Edx,
            R::RBX | R::EBX | R::BX | R::BL | R::BH => Register::Ebx,
            R::RSP | R::ESP | R::SP | R::SPL => Register::Esp,
            R::RBP | R::EBP | R::BP | R::BPL => Register::Ebp,
            R::RSI | R::ESI | R::SI | R::SIL => Register::Esi,
            R::RDI | R::EDI | R::DI | R::DIL => Register::Edi,
            R::R8 | R::R8D | R::R8W | R::R8L => Register::R8,
            R::R9 | R::R9D | R::R9W | R::R9L => Register::R9,
            R::R10 | R::R10D | R::R10W | R::R10L => Register::R10,
            R::R11 | R::R11D | R::R11W | R::R11L => Register::R11,
            R::R12 | R::R12D | R::R12W | R::R12L => Register::R12,
            R::R13 | R::R13D | R::R13W | R::R13L => Register::R13,
            R::R14 | R::R14D | R::R14W | R::R14L => Register::R14,
            R::R15 | R::R15D | R::R15W | R::R15L => Register::R15,
            _ => return None,
        };
        Some(gpr)
    }
}

impl FromStr for Register {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Register::ALL
            .into_iter()
            .find(|reg| reg.aliases().contains(&name.as_str()))
            .ok_or_else(|| RegisterError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of registers, bit `k` standing for the register with encoding `k`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterMask(u16);

impl RegisterMask {
    pub const EMPTY: RegisterMask = RegisterMask(0);

    /// Shift applied to place the mask in a packed candidate code.
    pub const CODE_SHIFT: u32 = 16;

    pub const fn from_bits(bits: u16) -> Self {
        RegisterMask(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// The mask positioned over the register field of a candidate code.
    pub const fn code_field(self) -> u32 {
        (self.0 as u32) << Self::CODE_SHIFT
    }

    pub fn insert(&mut self, reg: Register) {
        self.0 |= 1 << reg.index();
    }

    pub fn contains(self, reg: Register) -> bool {
        self.0 & (1 << reg.index()) != 0
    }

    pub fn intersects(self, other: RegisterMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Register> {
        Register::ALL.into_iter().filter(move |reg| self.contains(*reg))
    }

    /// Resolve a list of register names into a mask.
    pub fn from_names<I, S>(names: I) -> Result<Self, RegisterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().parse::<Register>())
            .collect()
    }
}

impl From<Register> for RegisterMask {
    fn from(reg: Register) -> Self {
        RegisterMask(1 << reg.index())
    }
}

impl BitOr for RegisterMask {
    type Output = RegisterMask;

    fn bitor(self, rhs: RegisterMask) -> RegisterMask {
        RegisterMask(self.0 | rhs.0)
    }
}

impl BitOr<Register> for RegisterMask {
    type Output = RegisterMask;

    fn bitor(self, rhs: Register) -> RegisterMask {
        self | RegisterMask::from(rhs)
    }
}

impl FromIterator<Register> for RegisterMask {
    fn from_iter<I: IntoIterator<Item = Register>>(iter: I) -> Self {
        let mut mask = RegisterMask::EMPTY;
        for reg in iter {
            mask.insert(reg);
        }
        mask
    }
}

impl fmt::Display for RegisterMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Register::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
