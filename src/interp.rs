//! A small reference evaluator for method bodies.
//!
//! Tests run the same method body before and after lowering against the
//! same inputs and compare outcomes: return value, trap kind, and which
//! runtime helpers actually executed. The evaluator models just enough of
//! the object world for the lowered IR to be meaningful: classes with a
//! flags word and an optional array component type, objects with content
//! words, arrays with elements.

use std::collections::{BTreeMap, HashMap};

use crate::compilation::Compilation;
use crate::il::node::NodeId;
use crate::il::opcode::Opcode;
use crate::il::symref::{KnownSymbol, SymRefId, SymRefKind};
use crate::il::treetop::TreeTopId;
use crate::il::VALUE_TYPE_CLASS_FLAG;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub u32);

/// A runtime value flowing through the trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Null,
    Ref(ObjRef),
    Class(ClassId),
    /// Address of one array element, produced by the element-address tree.
    ElemAddr(ObjRef, i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    NullPointer,
    BoundCheck,
    ArrayStore,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("trapped: {0:?}")]
    Trap(Trap),
    #[error("evaluation stuck: {0}")]
    Stuck(String),
}

#[derive(Debug, Clone)]
struct ClassDesc {
    flags: i64,
    component: Option<ClassId>,
}

#[derive(Debug, Clone)]
struct Object {
    class: ClassId,
    /// Content words for plain objects, compared for substitutability.
    content: Vec<i64>,
    /// Element slots for arrays.
    elements: Vec<Value>,
}

/// The heap and class table shared by one evaluation.
#[derive(Debug, Default)]
pub struct World {
    classes: Vec<ClassDesc>,
    objects: Vec<Object>,
    /// How many times each runtime helper ran, by helper name.
    pub helper_calls: BTreeMap<String, u64>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, flags: i64) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDesc { flags, component: None });
        id
    }

    pub fn add_value_class(&mut self) -> ClassId {
        self.add_class(VALUE_TYPE_CLASS_FLAG)
    }

    pub fn add_array_class(&mut self, component: ClassId) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDesc { flags: 0, component: Some(component) });
        id
    }

    pub fn new_object(&mut self, class: ClassId, content: Vec<i64>) -> Value {
        let id = ObjRef(self.objects.len() as u32);
        self.objects.push(Object { class, content, elements: Vec::new() });
        Value::Ref(id)
    }

    pub fn new_array(&mut self, class: ClassId, len: usize) -> Value {
        let id = ObjRef(self.objects.len() as u32);
        self.objects.push(Object { class, content: Vec::new(), elements: vec![Value::Null; len] });
        Value::Ref(id)
    }

    pub fn element(&self, array: Value, index: usize) -> Option<Value> {
        match array {
            Value::Ref(r) => self.objects[r.0 as usize].elements.get(index).copied(),
            _ => None,
        }
    }

    pub fn set_element(&mut self, array: Value, index: usize, value: Value) {
        if let Value::Ref(r) = array {
            self.objects[r.0 as usize].elements[index] = value;
        }
    }

    pub fn helper_total(&self) -> u64 {
        self.helper_calls.values().sum()
    }

    fn class_of(&self, r: ObjRef) -> ClassId {
        self.objects[r.0 as usize].class
    }

    fn flags_of(&self, c: ClassId) -> i64 {
        self.classes[c.0 as usize].flags
    }

    fn is_value_class(&self, c: ClassId) -> bool {
        self.flags_of(c) & VALUE_TYPE_CLASS_FLAG != 0
    }

    /// Substitutability: identical references, or two instances of the same
    /// value class with equal content.
    fn substitutable(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Ref(x), Value::Ref(y)) => {
                if x == y {
                    return true;
                }
                let (ox, oy) = (&self.objects[x.0 as usize], &self.objects[y.0 as usize]);
                ox.class == oy.class && self.is_value_class(ox.class) && ox.content == oy.content
            }
            _ => false,
        }
    }
}

const STEP_LIMIT: u64 = 100_000;

struct Interp<'a> {
    comp: &'a Compilation,
    world: &'a mut World,
    parms: HashMap<SymRefId, Value>,
    temps: HashMap<SymRefId, Value>,
    regs: HashMap<u16, Value>,
    cache: HashMap<NodeId, Value>,
    steps: u64,
}

/// Runs the method body from its first treetop. `parms` maps a parameter
/// load node (as returned by the method builder) to the argument value.
pub fn run(
    comp: &Compilation,
    world: &mut World,
    parms: &[(NodeId, Value)],
) -> Result<Option<Value>, EvalError> {
    let mut parm_map = HashMap::new();
    for &(node, value) in parms {
        let sr = comp
            .node(node)
            .symref
            .ok_or_else(|| EvalError::Stuck("parameter node has no symbol".to_string()))?;
        parm_map.insert(sr, value);
    }
    let mut interp = Interp {
        comp,
        world,
        parms: parm_map,
        temps: HashMap::new(),
        regs: HashMap::new(),
        cache: HashMap::new(),
        steps: 0,
    };
    interp.run()
}

impl Interp<'_> {
    fn run(&mut self) -> Result<Option<Value>, EvalError> {
        let mut tt = self
            .comp
            .first_treetop()
            .ok_or_else(|| EvalError::Stuck("empty method body".to_string()))?;
        loop {
            self.steps += 1;
            if self.steps > STEP_LIMIT {
                return Err(EvalError::Stuck("step limit exceeded".to_string()));
            }
            let root = self.comp.tt_node(tt);
            let n = self.comp.node(root);
            match n.op {
                Opcode::BBStart => {
                    let block = n.block.ok_or_else(|| {
                        EvalError::Stuck("block marker without a block".to_string())
                    })?;
                    if !self.comp.block(block).is_extension {
                        self.cache.clear();
                    }
                }
                Opcode::BBEnd => {
                    if n.num_children() > 0 {
                        self.apply_deps(n.child(0))?;
                    }
                }
                Opcode::Goto => {
                    if n.num_children() > 0 {
                        self.apply_deps(n.child(0))?;
                    }
                    tt = self.jump_target(root)?;
                    continue;
                }
                Opcode::Return => {
                    if n.num_children() > 0 {
                        let v = self.eval(n.child(0))?;
                        return Ok(Some(v));
                    }
                    return Ok(None);
                }
                op if op.is_branch() => {
                    let lhs = self.eval(n.child(0))?;
                    let rhs = self.eval(n.child(1))?;
                    let taken = match op {
                        Opcode::IfAcmpEq => lhs == rhs,
                        Opcode::IfIcmpEq => lhs == rhs,
                        Opcode::IfIcmpNe => lhs != rhs,
                        _ => unreachable!(),
                    };
                    if taken {
                        if n.num_children() > 2 {
                            self.apply_deps(n.child(2))?;
                        }
                        tt = self.jump_target(root)?;
                        continue;
                    }
                }
                _ => {
                    self.eval(root)?;
                }
            }
            tt = self
                .comp
                .next_tt(tt)
                .ok_or_else(|| EvalError::Stuck("fell off the end of the method".to_string()))?;
        }
    }

    fn jump_target(&self, branch: NodeId) -> Result<TreeTopId, EvalError> {
        self.comp
            .node(branch)
            .branch_target
            .ok_or_else(|| EvalError::Stuck("branch with no destination".to_string()))
    }

    /// Writes every listed register before control transfers.
    fn apply_deps(&mut self, deps: NodeId) -> Result<(), EvalError> {
        for i in 0..self.comp.node(deps).num_children() {
            let dep = self.comp.node(deps).child(i);
            let reg = self
                .comp
                .node(dep)
                .reg
                .ok_or_else(|| EvalError::Stuck("dependency entry without a register".to_string()))?;
            let value = if self.comp.node(dep).op == Opcode::PassThrough {
                self.eval(self.comp.node(dep).child(0))?
            } else {
                self.eval(dep)?
            };
            self.regs.insert(reg.0, value);
        }
        Ok(())
    }

    fn eval(&mut self, node: NodeId) -> Result<Value, EvalError> {
        if let Some(&v) = self.cache.get(&node) {
            return Ok(v);
        }
        let v = self.eval_uncached(node)?;
        self.cache.insert(node, v);
        Ok(v)
    }

    fn int(&mut self, node: NodeId) -> Result<i64, EvalError> {
        match self.eval(node)? {
            Value::Int(i) => Ok(i),
            other => Err(EvalError::Stuck(format!("expected integer, got {other:?}"))),
        }
    }

    fn eval_uncached(&mut self, node: NodeId) -> Result<Value, EvalError> {
        let n = self.comp.node(node);
        let op = n.op;
        match op {
            Opcode::IConst | Opcode::LConst => Ok(Value::Int(n.value)),
            Opcode::AConst => {
                if n.value == 0 {
                    Ok(Value::Null)
                } else {
                    Err(EvalError::Stuck("non-null address constant".to_string()))
                }
            }
            Opcode::TreeTop | Opcode::PassThrough | Opcode::CompressedRefsAnchor => {
                self.eval(n.child(0))
            }
            Opcode::ALoad | Opcode::ILoad => {
                let sr = n
                    .symref
                    .ok_or_else(|| EvalError::Stuck("load without a symbol".to_string()))?;
                match self.comp.symrefs.get(sr).kind {
                    SymRefKind::Parm => self
                        .parms
                        .get(&sr)
                        .copied()
                        .ok_or_else(|| EvalError::Stuck("unbound parameter".to_string())),
                    SymRefKind::Temp => self
                        .temps
                        .get(&sr)
                        .copied()
                        .ok_or_else(|| EvalError::Stuck("read of uninitialized temp".to_string())),
                    _ => Err(EvalError::Stuck("load from unexpected symbol".to_string())),
                }
            }
            Opcode::AStore | Opcode::IStore => {
                let sr = n
                    .symref
                    .ok_or_else(|| EvalError::Stuck("store without a symbol".to_string()))?;
                let v = self.eval(n.child(0))?;
                self.temps.insert(sr, v);
                Ok(v)
            }
            Opcode::IRegLoad | Opcode::ARegLoad => {
                let reg = n
                    .reg
                    .ok_or_else(|| EvalError::Stuck("register load without a register".to_string()))?;
                self.regs
                    .get(&reg.0)
                    .copied()
                    .ok_or_else(|| EvalError::Stuck(format!("read of undefined register gr{}", reg.0)))
            }
            Opcode::IRegStore | Opcode::ARegStore => {
                let reg = n
                    .reg
                    .ok_or_else(|| EvalError::Stuck("register store without a register".to_string()))?;
                let v = self.eval(n.child(0))?;
                self.regs.insert(reg.0, v);
                Ok(v)
            }
            Opcode::I2L => self.eval(n.child(0)),
            Opcode::LShl => {
                let a = self.int(n.child(0))?;
                let b = self.int(n.child(1))?;
                Ok(Value::Int(a << b))
            }
            Opcode::LAdd => {
                let a = self.int(n.child(0))?;
                let b = self.int(n.child(1))?;
                Ok(Value::Int(a + b))
            }
            Opcode::IAnd => {
                let a = self.int(n.child(0))?;
                let b = self.int(n.child(1))?;
                Ok(Value::Int(a & b))
            }
            Opcode::ALAdd => {
                let base = self.eval(n.child(0))?;
                let offset = self.int(n.child(1))?;
                let array = match base {
                    Value::Ref(r) => r,
                    Value::Null => return Err(EvalError::Trap(Trap::NullPointer)),
                    other => {
                        return Err(EvalError::Stuck(format!("address base {other:?}")));
                    }
                };
                let stride = self.comp.element_stride();
                let index = (offset - crate::il::ARRAY_HEADER_SIZE) / stride;
                Ok(Value::ElemAddr(array, index))
            }
            Opcode::ArrayLength => {
                let r = self.expect_ref(n.child(0))?;
                Ok(Value::Int(self.world.objects[r.0 as usize].elements.len() as i64))
            }
            Opcode::NullChk => {
                let v = self.eval(n.child(0))?;
                if v == Value::Null {
                    Err(EvalError::Trap(Trap::NullPointer))
                } else {
                    Ok(v)
                }
            }
            Opcode::BndChk => {
                let len = self.int(n.child(0))?;
                let idx = self.int(n.child(1))?;
                if idx < 0 || idx >= len {
                    Err(EvalError::Trap(Trap::BoundCheck))
                } else {
                    Ok(Value::Int(0))
                }
            }
            Opcode::ArrayStoreChk => {
                let store = n.child(0);
                let value = self.eval(self.comp.node(store).child(1))?;
                let array = self.expect_ref(self.comp.node(store).child(2))?;
                let component = self.world.classes[self.world.class_of(array).0 as usize].component;
                if let (Value::Ref(v), Some(c)) = (value, component) {
                    if self.world.class_of(v) != c {
                        return Err(EvalError::Trap(Trap::ArrayStore));
                    }
                }
                self.eval(store)
            }
            Opcode::ALoadIndirect | Opcode::ILoadIndirect => self.eval_indirect_load(node),
            Opcode::AStoreIndirect => {
                let addr = self.eval(n.child(0))?;
                let value = self.eval(n.child(1))?;
                let Value::ElemAddr(array, index) = addr else {
                    return Err(EvalError::Stuck(format!("store through {addr:?}")));
                };
                let elements = &mut self.world.objects[array.0 as usize].elements;
                let slot = elements
                    .get_mut(index as usize)
                    .ok_or(EvalError::Trap(Trap::BoundCheck))?;
                *slot = value;
                Ok(value)
            }
            Opcode::Call => self.eval_call(node),
            Opcode::ACmpEq | Opcode::ACmpNe => {
                let a = self.eval(n.child(0))?;
                let b = self.eval(n.child(1))?;
                let eq = a == b;
                let res = if op == Opcode::ACmpEq { eq } else { !eq };
                Ok(Value::Int(res as i64))
            }
            other => Err(EvalError::Stuck(format!("cannot evaluate {}", other.name()))),
        }
    }

    fn expect_ref(&mut self, node: NodeId) -> Result<ObjRef, EvalError> {
        match self.eval(node)? {
            Value::Ref(r) => Ok(r),
            Value::Null => Err(EvalError::Trap(Trap::NullPointer)),
            other => Err(EvalError::Stuck(format!("expected reference, got {other:?}"))),
        }
    }

    fn eval_indirect_load(&mut self, node: NodeId) -> Result<Value, EvalError> {
        let n = self.comp.node(node);
        let sr = n
            .symref
            .ok_or_else(|| EvalError::Stuck("indirect load without a symbol".to_string()))?;
        match self.comp.symrefs.get(sr).kind {
            SymRefKind::ArrayShadow => {
                let addr = self.eval(n.child(0))?;
                let Value::ElemAddr(array, index) = addr else {
                    return Err(EvalError::Stuck(format!("load through {addr:?}")));
                };
                self.world
                    .objects[array.0 as usize]
                    .elements
                    .get(index as usize)
                    .copied()
                    .ok_or(EvalError::Trap(Trap::BoundCheck))
            }
            SymRefKind::Known(KnownSymbol::Vft) => {
                let r = self.expect_ref(n.child(0))?;
                Ok(Value::Class(self.world.class_of(r)))
            }
            SymRefKind::Known(KnownSymbol::ArrayComponentType) => match self.eval(n.child(0))? {
                Value::Class(c) => match self.world.classes[c.0 as usize].component {
                    Some(comp) => Ok(Value::Class(comp)),
                    None => Ok(Value::Class(c)),
                },
                other => Err(EvalError::Stuck(format!("component type of {other:?}"))),
            },
            SymRefKind::Known(KnownSymbol::ClassFlags) => match self.eval(n.child(0))? {
                Value::Class(c) => Ok(Value::Int(self.world.flags_of(c))),
                other => Err(EvalError::Stuck(format!("class flags of {other:?}"))),
            },
            _ => Err(EvalError::Stuck("indirect load from unexpected symbol".to_string())),
        }
    }

    fn eval_call(&mut self, node: NodeId) -> Result<Value, EvalError> {
        let n = self.comp.node(node);
        let sr = n
            .symref
            .ok_or_else(|| EvalError::Stuck("call without a symbol".to_string()))?;
        let Some(known) = self.comp.symrefs.known_symbol(sr) else {
            return Err(EvalError::Stuck("call to unknown symbol".to_string()));
        };
        self.world
            .helper_calls
            .entry(known.name().to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        match known {
            KnownSymbol::ObjectEqualityComparison | KnownSymbol::AcmpHelper => {
                let a = self.eval(n.child(0))?;
                let b = self.eval(n.child(1))?;
                Ok(Value::Int(self.world.substitutable(a, b) as i64))
            }
            KnownSymbol::ObjectInequalityComparison | KnownSymbol::AcmpneHelper => {
                let a = self.eval(n.child(0))?;
                let b = self.eval(n.child(1))?;
                Ok(Value::Int(!self.world.substitutable(a, b) as i64))
            }
            KnownSymbol::LoadArrayElement | KnownSymbol::LoadArrayElementHelper => {
                let index = self.int(n.child(0))?;
                let array = self.expect_ref(n.child(1))?;
                self.world
                    .objects[array.0 as usize]
                    .elements
                    .get(index as usize)
                    .filter(|_| index >= 0)
                    .copied()
                    .ok_or(EvalError::Trap(Trap::BoundCheck))
            }
            KnownSymbol::StoreArrayElement | KnownSymbol::StoreArrayElementHelper => {
                let value = self.eval(n.child(0))?;
                let index = self.int(n.child(1))?;
                let array = self.expect_ref(n.child(2))?;
                let class = self.world.class_of(array);
                let component = self.world.classes[class.0 as usize].component;
                if let Some(c) = component {
                    if self.world.is_value_class(c) && value == Value::Null {
                        return Err(EvalError::Trap(Trap::NullPointer));
                    }
                }
                let len = self.world.objects[array.0 as usize].elements.len() as i64;
                if index < 0 || index >= len {
                    return Err(EvalError::Trap(Trap::BoundCheck));
                }
                if let (Value::Ref(v), Some(c)) = (value, component) {
                    if self.world.class_of(v) != c {
                        return Err(EvalError::Trap(Trap::ArrayStore));
                    }
                }
                self.world.objects[array.0 as usize].elements[index as usize] = value;
                Ok(value)
            }
            other => Err(EvalError::Stuck(format!("call to {}", other.name()))),
        }
    }
}
