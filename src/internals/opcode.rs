// The primitive opcode enumeration
//
// Every code field in the dictionary holds one of these values: primitives
// carry their own opcode, compound words carry Docol. Dispatch decodes the
// cell with TryFromPrimitive; a cell that decodes to nothing is the
// invalid-opcode trap. 0 is deliberately unassigned so that executing
// uninitialized memory traps immediately.

use num_enum::TryFromPrimitive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(i32)]
pub enum Opcode {
    // = 0 is reserved: it traps reads from uninitialized memory
    Docol = 1,
    Exit = 2,
    Lit = 3,

    // stack shuffling
    Drop = 4,
    Swap = 5,
    Dup = 6,
    Over = 7,
    Rot = 8,
    NRot = 9,
    TwoDrop = 10,
    TwoDup = 11,
    TwoSwap = 12,
    QDup = 13,

    // arithmetic
    Incr = 14,
    Decr = 15,
    Incr4 = 16,
    Decr4 = 17,
    Add = 18,
    Sub = 19,
    Mul = 20,
    DivMod = 21,

    // comparison
    Equ = 22,
    NEqu = 23,
    Lt = 24,
    Gt = 25,
    Le = 26,
    Ge = 27,
    ZEqu = 28,
    ZNEqu = 29,
    ZLt = 30,
    ZGt = 31,
    ZLe = 32,
    ZGe = 33,

    // bitwise
    And = 34,
    Or = 35,
    Xor = 36,
    Invert = 37,

    // memory
    Store = 38,
    Fetch = 39,
    AddStore = 40,
    SubStore = 41,
    StoreByte = 42,
    FetchByte = 43,
    CopyByte = 44,
    CMove = 45,

    // variables and constants
    State = 46,
    Here = 47,
    Latest = 48,
    S0 = 49,
    Base = 50,
    Version = 51,
    R0 = 52,
    DocolConst = 53,
    FImmed = 54,
    FHidden = 55,
    FLenMask = 56,

    // return stack
    ToR = 57,
    FromR = 58,
    RspFetch = 59,
    RspStore = 60,
    RDrop = 61,
    DspFetch = 62,
    DspStore = 63,

    // input/output
    Key = 64,
    Emit = 65,
    Word = 66,
    Tell = 67,

    // parsing and dictionary
    Number = 68,
    Find = 69,
    Tcfa = 70,
    Create = 71,
    Comma = 72,
    LBrac = 73,
    RBrac = 74,
    Immediate = 75,
    Hidden = 76,
    Tick = 77,
    Char = 78,
    Execute = 79,
    Interpret = 80,

    // control transfer
    Branch = 81,
    ZBranch = 82,
    LitString = 83,

    // process
    Bye = 84,
    Unused = 85,
}
