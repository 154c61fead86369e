use super::references::{ReferenceAllocator, ReferenceId};
use crate::parser::HANDLE_SIGIL;
use indexmap::IndexMap;

pub const NO_VARIABLES: &str = "no variables";

/// One variable line from a dump, e.g. `Local count:Int=3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    /// First word of the declaration (`Local`, `Field`, `Global`, ...).
    pub type_tag: String,
    /// Non-zero when the value is an object handle that can be dumped.
    pub reference: ReferenceId,
    /// Lower-cased spellings a user may type to evaluate this variable.
    pub fuzzy_keys: [String; 3],
}

impl Variable {
    /// Splits a raw `declaration=value` line. The result is never expandable;
    /// see [`Variable::convert`] for reference allocation.
    pub fn parse(raw: &str) -> Self {
        let (declaration, value) = match raw.rfind('=') {
            Some(pos) => (raw[..pos].trim(), raw[pos + 1..].trim()),
            None => (raw.trim(), ""),
        };

        Self {
            name: declaration.to_string(),
            value: value.to_string(),
            type_tag: declaration
                .split(' ')
                .next()
                .unwrap_or_default()
                .to_string(),
            reference: 0,
            fuzzy_keys: fuzzy_keys(declaration),
        }
    }

    /// Parses `raw` and, if its value is an object handle, gives it a fresh
    /// reference id and records it as pending expansion.
    pub fn convert(
        raw: &str,
        refs: &mut ReferenceAllocator,
        pending: &mut PendingReferences,
    ) -> Self {
        let mut variable = Self::parse(raw);
        if variable.is_handle() {
            variable.reference = refs.allocate();
            pending.push(variable.clone());
        }
        variable
    }

    /// Placeholder listed for a scope the debuggee reported no locals for.
    pub fn no_variables() -> Self {
        Self {
            name: NO_VARIABLES.to_string(),
            value: String::new(),
            type_tag: String::new(),
            reference: 0,
            fuzzy_keys: Default::default(),
        }
    }

    /// `$1f2e` is a handle, `${...}` is an inline composite.
    pub fn is_handle(&self) -> bool {
        self.value.starts_with(HANDLE_SIGIL) && !self.value.ends_with('}')
    }

    pub fn is_expandable(&self) -> bool {
        self.reference != 0
    }

    /// `expression` must already be lower-cased.
    pub fn matches(&self, expression: &str) -> bool {
        self.fuzzy_keys.iter().any(|key| key == expression)
    }
}

/// Full declaration, the part between the kind word and the type suffix,
/// and everything after the kind word.
fn fuzzy_keys(declaration: &str) -> [String; 3] {
    let after_kind = declaration.find(' ').map_or(0, |pos| pos + 1);
    let type_colon = declaration.rfind(':').unwrap_or(0);
    let (start, end) = if after_kind > type_colon {
        (type_colon, after_kind)
    } else {
        (after_kind, type_colon)
    };

    [
        declaration.to_lowercase(),
        declaration[start..end].to_lowercase(),
        declaration[after_kind..].to_lowercase(),
    ]
}

/// Handle variables waiting for their first expansion.
#[derive(Debug, Default)]
pub struct PendingReferences {
    variables: Vec<Variable>,
}

impl PendingReferences {
    pub fn push(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    pub fn get(&self, reference: ReferenceId) -> Option<&Variable> {
        self.variables.iter().find(|v| v.reference == reference)
    }

    /// Removes the variable; a reference is expanded at most once.
    pub fn take(&mut self, reference: ReferenceId) -> Option<Variable> {
        let index = self
            .variables
            .iter()
            .position(|v| v.reference == reference)?;
        Some(self.variables.remove(index))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }
}

/// Every variable shown to the client, keyed by name, for `evaluate`.
#[derive(Debug, Default)]
pub struct VariableIndex {
    by_name: IndexMap<String, Variable>,
}

impl VariableIndex {
    /// Replaces an earlier variable of the same name in place.
    pub fn record(&mut self, variable: &Variable) {
        self.by_name.insert(variable.name.clone(), variable.clone());
    }

    /// First variable, in recording order, answering to `expression`.
    pub fn lookup(&self, expression: &str) -> Option<&Variable> {
        let expression = expression.to_lowercase();
        self.by_name.values().find(|v| v.matches(&expression))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_assignment() {
        let var = Variable::parse("x:Int = 5");
        assert_eq!(var.name, "x:Int");
        assert_eq!(var.value, "5");
        assert_eq!(var.type_tag, "x:Int");
        assert_eq!(var.reference, 0);
        assert!(var.fuzzy_keys.contains(&"x:int".to_string()));
        assert!(var.matches("x"));
    }

    #[test]
    fn parses_debugger_declaration() {
        let var = Variable::parse("Local Count:Int=3");
        assert_eq!(var.name, "Local Count:Int");
        assert_eq!(var.value, "3");
        assert_eq!(var.type_tag, "Local");
        assert_eq!(
            var.fuzzy_keys,
            [
                "local count:int".to_string(),
                "count".to_string(),
                "count:int".to_string()
            ]
        );
    }

    #[test]
    fn splits_on_last_equals() {
        let var = Variable::parse("Local s:String=\"a=b\"");
        assert_eq!(var.name, "Local s:String=\"a");
        assert_eq!(var.value, "b\"");
    }

    #[test]
    fn bare_declaration_has_empty_value() {
        let var = Variable::parse("Local list:TList");
        assert_eq!(var.name, "Local list:TList");
        assert_eq!(var.value, "");
        assert!(!var.is_handle());
    }

    #[test]
    fn key_without_type_suffix() {
        let var = Variable::parse("Local flag=1");
        assert_eq!(var.fuzzy_keys[1], "local ");
        assert_eq!(var.fuzzy_keys[2], "flag");
    }

    #[test]
    fn handle_gets_reference_and_is_pending() {
        let mut refs = ReferenceAllocator::new();
        let mut pending = PendingReferences::default();

        let var = Variable::convert("obj:TFoo = $a1b2", &mut refs, &mut pending);
        assert_eq!(var.reference, 1);
        assert!(var.is_expandable());
        assert_eq!(pending.get(1).map(|v| v.value.as_str()), Some("$a1b2"));

        let inline = Variable::convert("Local v:Vec=${1,2}", &mut refs, &mut pending);
        assert_eq!(inline.reference, 0);
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn pending_take_is_one_shot() {
        let mut refs = ReferenceAllocator::new();
        let mut pending = PendingReferences::default();
        Variable::convert("Local o:Object=$ff", &mut refs, &mut pending);

        assert!(pending.take(1).is_some());
        assert!(pending.take(1).is_none());
        assert!(pending.is_empty());
    }

    #[test]
    fn index_lookup_is_case_insensitive_and_keeps_order() {
        let mut index = VariableIndex::default();
        index.record(&Variable::parse("Local Count:Int=3"));
        index.record(&Variable::parse("Field count:Int=9"));
        index.record(&Variable::parse("Local Count:Int=4"));

        assert_eq!(index.len(), 2);
        let found = index.lookup("COUNT").unwrap();
        assert_eq!(found.name, "Local Count:Int");
        assert_eq!(found.value, "4");
        assert!(index.lookup("missing").is_none());
    }
}
