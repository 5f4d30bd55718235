use std::collections::HashMap;

/// Index of a symbol reference in the [`SymRefTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymRefId(pub u32);

/// Well-known symbols the lowering engine recognizes or creates.
///
/// The comparison and array-element symbols come in two forms: the
/// *non-helper* form the front end emits (the recognition pattern for the
/// classifier) and the helper form a residual out-of-line call is given once
/// a site has been lowered. The split keeps the pass idempotent: nothing the
/// engine leaves behind matches the classifier again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownSymbol {
    // Non-helper forms, produced by IL generation.
    ObjectEqualityComparison,
    ObjectInequalityComparison,
    LoadArrayElement,
    StoreArrayElement,

    // Helper forms, targets of residual out-of-line calls.
    AcmpHelper,
    AcmpneHelper,
    LoadArrayElementHelper,
    StoreArrayElementHelper,

    // Check symbols.
    NullCheck,
    BoundCheck,
    TypeCheckArrayStore,

    // Object-model fields.
    Vft,
    ClassFlags,
    ArrayComponentType,
}

impl KnownSymbol {
    pub fn name(self) -> &'static str {
        match self {
            KnownSymbol::ObjectEqualityComparison => "<objectEqualityComparison>",
            KnownSymbol::ObjectInequalityComparison => "<objectInequalityComparison>",
            KnownSymbol::LoadArrayElement => "<loadArrayElement>",
            KnownSymbol::StoreArrayElement => "<storeArrayElement>",
            KnownSymbol::AcmpHelper => "acmpHelper",
            KnownSymbol::AcmpneHelper => "acmpneHelper",
            KnownSymbol::LoadArrayElementHelper => "loadArrayElementHelper",
            KnownSymbol::StoreArrayElementHelper => "storeArrayElementHelper",
            KnownSymbol::NullCheck => "<nullCheck>",
            KnownSymbol::BoundCheck => "<boundCheck>",
            KnownSymbol::TypeCheckArrayStore => "<typeCheckArrayStore>",
            KnownSymbol::Vft => "<vft>",
            KnownSymbol::ClassFlags => "<classFlags>",
            KnownSymbol::ArrayComponentType => "<arrayComponentType>",
        }
    }

    /// True for helper calls that produce an address-typed result.
    pub fn returns_address(self) -> bool {
        matches!(
            self,
            KnownSymbol::LoadArrayElement | KnownSymbol::LoadArrayElementHelper
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymRefKind {
    Known(KnownSymbol),
    /// Compiler-generated temp slot.
    Temp,
    /// Incoming method parameter.
    Parm,
    /// Array element shadow; accesses through it alias other array shadows.
    ArrayShadow,
}

#[derive(Debug, Clone)]
pub struct SymbolRef {
    pub name: String,
    pub kind: SymRefKind,
}

/// Interns symbol references for one compilation.
///
/// All well-known symbols are created eagerly so lookups are infallible;
/// temps, parms and array shadows are created on demand. Creating an array
/// shadow reports that alias info must be revalidated.
#[derive(Debug)]
pub struct SymRefTable {
    refs: Vec<SymbolRef>,
    known: HashMap<KnownSymbol, SymRefId>,
    next_temp: u32,
}

const ALL_KNOWN: [KnownSymbol; 14] = [
    KnownSymbol::ObjectEqualityComparison,
    KnownSymbol::ObjectInequalityComparison,
    KnownSymbol::LoadArrayElement,
    KnownSymbol::StoreArrayElement,
    KnownSymbol::AcmpHelper,
    KnownSymbol::AcmpneHelper,
    KnownSymbol::LoadArrayElementHelper,
    KnownSymbol::StoreArrayElementHelper,
    KnownSymbol::NullCheck,
    KnownSymbol::BoundCheck,
    KnownSymbol::TypeCheckArrayStore,
    KnownSymbol::Vft,
    KnownSymbol::ClassFlags,
    KnownSymbol::ArrayComponentType,
];

impl SymRefTable {
    pub fn new() -> Self {
        let mut table = Self { refs: Vec::new(), known: HashMap::new(), next_temp: 0 };
        for k in ALL_KNOWN {
            let id = table.intern(SymbolRef { name: k.name().to_string(), kind: SymRefKind::Known(k) });
            table.known.insert(k, id);
        }
        table
    }

    fn intern(&mut self, sr: SymbolRef) -> SymRefId {
        let id = SymRefId(self.refs.len() as u32);
        self.refs.push(sr);
        id
    }

    pub fn get(&self, id: SymRefId) -> &SymbolRef {
        &self.refs[id.0 as usize]
    }

    pub fn known(&self, k: KnownSymbol) -> SymRefId {
        self.known[&k]
    }

    pub fn known_symbol(&self, id: SymRefId) -> Option<KnownSymbol> {
        match self.get(id).kind {
            SymRefKind::Known(k) => Some(k),
            _ => None,
        }
    }

    pub fn create_temp(&mut self) -> SymRefId {
        let n = self.next_temp;
        self.next_temp += 1;
        self.intern(SymbolRef { name: format!("<temp slot {n}>"), kind: SymRefKind::Temp })
    }

    pub fn create_parm(&mut self, name: &str) -> SymRefId {
        self.intern(SymbolRef { name: name.to_string(), kind: SymRefKind::Parm })
    }

    /// Creates an array element shadow. The caller must flag alias info as
    /// stale; downstream alias analysis has not seen this symbol.
    pub fn create_array_shadow(&mut self) -> SymRefId {
        self.intern(SymbolRef { name: "<array-shadow>".to_string(), kind: SymRefKind::ArrayShadow })
    }
}

impl Default for SymRefTable {
    fn default() -> Self {
        Self::new()
    }
}
