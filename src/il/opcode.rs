/// Opcodes for IL nodes.
///
/// The `I`/`A`/`L` prefixes follow the usual convention: 32-bit integer,
/// address, 64-bit integer. Indirect loads and stores go through a symbol
/// reference describing the accessed storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    // Constants
    IConst,
    LConst,
    AConst,

    // Direct loads/stores (temps and parms)
    ILoad,
    ALoad,
    IStore,
    AStore,

    // Indirect loads/stores (through a symbol reference)
    ILoadIndirect,
    ALoadIndirect,
    AStoreIndirect,

    // Global register traffic
    IRegLoad,
    ARegLoad,
    IRegStore,
    ARegStore,

    // Register-dependency bookkeeping
    PassThrough,
    GlRegDeps,

    // Anchors and block markers
    TreeTop,
    BBStart,
    BBEnd,

    // Control flow
    Goto,
    IfAcmpEq,
    IfIcmpEq,
    IfIcmpNe,
    Return,

    // Comparisons
    ACmpEq,
    ACmpNe,

    // Arithmetic (address computation)
    IAnd,
    I2L,
    LShl,
    LAdd,
    ALAdd,

    // Checks
    NullChk,
    BndChk,
    ArrayStoreChk,

    ArrayLength,
    CompressedRefsAnchor,

    Call,
}

impl Opcode {
    pub fn is_call(self) -> bool {
        matches!(self, Opcode::Call)
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::IfAcmpEq | Opcode::IfIcmpEq | Opcode::IfIcmpNe)
    }

    pub fn is_reg_load(self) -> bool {
        matches!(self, Opcode::IRegLoad | Opcode::ARegLoad)
    }

    pub fn is_reg_store(self) -> bool {
        matches!(self, Opcode::IRegStore | Opcode::ARegStore)
    }

    pub fn is_check(self) -> bool {
        matches!(self, Opcode::NullChk | Opcode::BndChk | Opcode::ArrayStoreChk)
    }

    /// True for opcodes whose result is an address.
    pub fn is_address_producer(self) -> bool {
        matches!(
            self,
            Opcode::AConst
                | Opcode::ALoad
                | Opcode::ALoadIndirect
                | Opcode::ARegLoad
                | Opcode::ALAdd
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::IConst => "iconst",
            Opcode::LConst => "lconst",
            Opcode::AConst => "aconst",
            Opcode::ILoad => "iload",
            Opcode::ALoad => "aload",
            Opcode::IStore => "istore",
            Opcode::AStore => "astore",
            Opcode::ILoadIndirect => "iloadi",
            Opcode::ALoadIndirect => "aloadi",
            Opcode::AStoreIndirect => "astorei",
            Opcode::IRegLoad => "iRegLoad",
            Opcode::ARegLoad => "aRegLoad",
            Opcode::IRegStore => "iRegStore",
            Opcode::ARegStore => "aRegStore",
            Opcode::PassThrough => "PassThrough",
            Opcode::GlRegDeps => "GlRegDeps",
            Opcode::TreeTop => "treetop",
            Opcode::BBStart => "BBStart",
            Opcode::BBEnd => "BBEnd",
            Opcode::Goto => "goto",
            Opcode::IfAcmpEq => "ifacmpeq",
            Opcode::IfIcmpEq => "ificmpeq",
            Opcode::IfIcmpNe => "ificmpne",
            Opcode::Return => "return",
            Opcode::ACmpEq => "acmpeq",
            Opcode::ACmpNe => "acmpne",
            Opcode::IAnd => "iand",
            Opcode::I2L => "i2l",
            Opcode::LShl => "lshl",
            Opcode::LAdd => "ladd",
            Opcode::ALAdd => "aladd",
            Opcode::NullChk => "NULLCHK",
            Opcode::BndChk => "BNDCHK",
            Opcode::ArrayStoreChk => "ArrayStoreCHK",
            Opcode::ArrayLength => "arraylength",
            Opcode::CompressedRefsAnchor => "compressedRefs",
            Opcode::Call => "call",
        }
    }
}
