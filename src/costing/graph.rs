use rust_decimal::Decimal;
use std::collections::HashMap;

/// Display identity of a component as the roll-up reports it
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRef {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub uom: Option<String>,
}

/// One BOM edge, already normalized to quantity per single parent unit
/// (line quantity divided by the header's output quantity)
#[derive(Debug, Clone, PartialEq)]
pub struct BomLineSpec {
    pub component_id: i64,
    pub quantity_per_unit: Decimal,
}

/// The chosen BOM version for one component
#[derive(Debug, Clone, PartialEq)]
pub struct BomSpec {
    pub bom_id: i64,
    pub lines: Vec<BomLineSpec>,
}

/// In-memory input to the roll-up engine: every component of the transitive
/// closure, and at most one BOM per component (the caller-supplied version
/// for the root, the latest-effective version for sub-assemblies).
///
/// The graph may contain cycles: BOM data is taken as found, and the engine
/// detects re-entry along the traversal path rather than trusting the data
/// to be a tree.
#[derive(Debug, Clone)]
pub struct BomGraph {
    root_id: i64,
    components: HashMap<i64, ComponentRef>,
    boms: HashMap<i64, BomSpec>,
}

impl BomGraph {
    pub fn new(root: ComponentRef) -> Self {
        let root_id = root.id;
        let mut components = HashMap::new();
        components.insert(root_id, root);
        Self {
            root_id,
            components,
            boms: HashMap::new(),
        }
    }

    pub fn add_component(&mut self, component: ComponentRef) {
        self.components.entry(component.id).or_insert(component);
    }

    pub fn set_bom(&mut self, component_id: i64, bom: BomSpec) {
        self.boms.insert(component_id, bom);
    }

    pub fn root_id(&self) -> i64 {
        self.root_id
    }

    pub fn root(&self) -> &ComponentRef {
        &self.components[&self.root_id]
    }

    pub fn component(&self, component_id: i64) -> Option<&ComponentRef> {
        self.components.get(&component_id)
    }

    /// The BOM expanding `component_id`, if it is not a terminal component.
    /// An empty BOM counts as terminal: a recipe with no inputs prices like
    /// a purchased part, not like a free one.
    pub fn bom_for(&self, component_id: i64) -> Option<&BomSpec> {
        self.boms
            .get(&component_id)
            .filter(|bom| !bom.lines.is_empty())
    }

    /// Ids of every component in the graph, root included
    pub fn component_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.components.keys().copied()
    }
}
