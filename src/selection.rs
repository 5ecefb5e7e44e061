//! Configuration form and the selection snapshot assembled from it
//!
//! The form mirrors a set of radio groups plus one checkbox group. A
//! [`ConfigurationSelection`] is built from whatever is checked at submit time
//! and lives only as long as the connect request that carries it.

use serde::Serialize;

use crate::config::OptionCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionField {
    Move,
    Grasp,
    Policy,
    Llm,
    Vlm,
    Vla,
}

impl SelectionField {
    pub fn all() -> [SelectionField; 6] {
        [
            SelectionField::Move,
            SelectionField::Grasp,
            SelectionField::Policy,
            SelectionField::Llm,
            SelectionField::Vlm,
            SelectionField::Vla,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            SelectionField::Move => "Movement confirmation",
            SelectionField::Grasp => "Grasp confirmation",
            SelectionField::Policy => "Policy",
            SelectionField::Llm => "LLM",
            SelectionField::Vlm => "VLM",
            SelectionField::Vla => "VLA",
        }
    }

    /// Checkbox group rather than radio group
    pub fn is_multi(&self) -> bool {
        matches!(self, SelectionField::Policy)
    }
}

/// Body of the connect request. Unchecked single-valued fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConfigurationSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moveconf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graspconf: Option<String>,
    pub policyconf: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llmconf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlmconf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlaconf: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OptionGroup {
    field: SelectionField,
    options: Vec<String>,
    checked: Vec<bool>,
}

impl OptionGroup {
    pub fn new(field: SelectionField, options: Vec<String>) -> Self {
        let checked = vec![false; options.len()];
        Self {
            field,
            options,
            checked,
        }
    }

    pub fn field(&self) -> SelectionField {
        self.field
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_checked(&self, idx: usize) -> bool {
        self.checked.get(idx).copied().unwrap_or(false)
    }

    /// Radio groups check `idx` and uncheck the rest; checkbox groups flip it.
    pub fn activate(&mut self, idx: usize) {
        if idx >= self.options.len() {
            return;
        }
        if self.field.is_multi() {
            self.checked[idx] = !self.checked[idx];
        } else {
            for (i, slot) in self.checked.iter_mut().enumerate() {
                *slot = i == idx;
            }
        }
    }

    fn checked_values(&self) -> impl Iterator<Item = &String> {
        self.options
            .iter()
            .zip(&self.checked)
            .filter_map(|(option, checked)| checked.then_some(option))
    }

    pub fn single_value(&self) -> Option<String> {
        self.checked_values().next().cloned()
    }

    pub fn values(&self) -> Vec<String> {
        self.checked_values().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationForm {
    groups: Vec<OptionGroup>,
    /// (group, option) under the cursor
    cursor: (usize, usize),
}

impl ConfigurationForm {
    /// Build a form with nothing checked
    pub fn new(catalog: &OptionCatalog) -> Self {
        let groups = SelectionField::all()
            .into_iter()
            .map(|field| OptionGroup::new(field, catalog.options(field).to_vec()))
            .collect();
        Self {
            groups,
            cursor: (0, 0),
        }
    }

    /// Build a form whose radio groups start on their first option
    pub fn with_defaults(catalog: &OptionCatalog) -> Self {
        let mut form = Self::new(catalog);
        for group in form.groups.iter_mut().filter(|g| !g.field.is_multi()) {
            group.activate(0);
        }
        form
    }

    pub fn groups(&self) -> &[OptionGroup] {
        &self.groups
    }

    pub fn group(&self, field: SelectionField) -> Option<&OptionGroup> {
        self.groups.iter().find(|g| g.field == field)
    }

    /// Activate the option named `value` in `field`. Returns false if it does not exist.
    pub fn select(&mut self, field: SelectionField, value: &str) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.field == field) else {
            return false;
        };
        match group.options.iter().position(|option| option == value) {
            Some(idx) => {
                group.activate(idx);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current selection
    pub fn assemble(&self) -> ConfigurationSelection {
        let single = |field| self.group(field).and_then(OptionGroup::single_value);
        ConfigurationSelection {
            moveconf: single(SelectionField::Move),
            graspconf: single(SelectionField::Grasp),
            policyconf: self
                .group(SelectionField::Policy)
                .map(OptionGroup::values)
                .unwrap_or_default(),
            llmconf: single(SelectionField::Llm),
            vlmconf: single(SelectionField::Vlm),
            vlaconf: single(SelectionField::Vla),
        }
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    fn positions(&self) -> Vec<(usize, usize)> {
        self.groups
            .iter()
            .enumerate()
            .flat_map(|(g, group)| (0..group.options.len()).map(move |o| (g, o)))
            .collect()
    }

    pub fn cursor_next(&mut self) {
        let positions = self.positions();
        if let Some(i) = positions.iter().position(|p| *p == self.cursor) {
            self.cursor = positions[(i + 1).min(positions.len() - 1)];
        } else if let Some(first) = positions.first() {
            self.cursor = *first;
        }
    }

    pub fn cursor_prev(&mut self) {
        let positions = self.positions();
        if let Some(i) = positions.iter().position(|p| *p == self.cursor) {
            self.cursor = positions[i.saturating_sub(1)];
        } else if let Some(first) = positions.first() {
            self.cursor = *first;
        }
    }

    pub fn activate_cursor(&mut self) {
        let (g, o) = self.cursor;
        if let Some(group) = self.groups.get_mut(g) {
            group.activate(o);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> OptionCatalog {
        OptionCatalog {
            move_modes: vec!["3D Pos".into(), "Confirm".into()],
            grasp_modes: vec!["dg".into(), "cag".into()],
            policies: vec!["A".into(), "B".into(), "C".into()],
            llms: vec!["gpt-4-turbo".into()],
            vlms: vec!["owl-vit".into()],
            vlas: vec!["dp".into()],
        }
    }

    #[test]
    fn test_policy_checkboxes_collect_in_order_and_unchecked_llm_is_omitted() {
        let mut form = ConfigurationForm::new(&catalog());
        form.select(SelectionField::Move, "3D Pos");
        form.select(SelectionField::Grasp, "dg");
        form.select(SelectionField::Policy, "B");
        form.select(SelectionField::Policy, "A");
        form.select(SelectionField::Vlm, "owl-vit");
        form.select(SelectionField::Vla, "dp");

        let selection = form.assemble();
        assert_eq!(selection.policyconf, vec!["A", "B"]);
        assert_eq!(selection.llmconf, None);
        assert_eq!(
            serde_json::to_value(&selection).unwrap(),
            json!({
                "moveconf": "3D Pos",
                "graspconf": "dg",
                "policyconf": ["A", "B"],
                "vlmconf": "owl-vit",
                "vlaconf": "dp"
            })
        );
    }

    #[test]
    fn test_radio_group_keeps_single_value() {
        let mut form = ConfigurationForm::new(&catalog());
        form.select(SelectionField::Grasp, "dg");
        form.select(SelectionField::Grasp, "cag");
        let group = form.group(SelectionField::Grasp).unwrap();
        assert_eq!(group.values(), vec!["cag"]);
    }

    #[test]
    fn test_checkbox_activation_flips() {
        let mut form = ConfigurationForm::new(&catalog());
        form.select(SelectionField::Policy, "C");
        form.select(SelectionField::Policy, "C");
        assert!(form.assemble().policyconf.is_empty());
    }

    #[test]
    fn test_empty_form_serializes_only_policy_list() {
        let form = ConfigurationForm::new(&catalog());
        assert_eq!(
            serde_json::to_value(form.assemble()).unwrap(),
            json!({"policyconf": []})
        );
    }

    #[test]
    fn test_defaults_check_first_radio_option() {
        let form = ConfigurationForm::with_defaults(&catalog());
        let selection = form.assemble();
        assert_eq!(selection.moveconf.as_deref(), Some("3D Pos"));
        assert_eq!(selection.graspconf.as_deref(), Some("dg"));
        assert!(selection.policyconf.is_empty());
    }

    #[test]
    fn test_unknown_option_is_not_selected() {
        let mut form = ConfigurationForm::new(&catalog());
        assert!(!form.select(SelectionField::Llm, "nope"));
        assert_eq!(form.assemble().llmconf, None);
    }

    #[test]
    fn test_cursor_walks_across_groups() {
        let mut form = ConfigurationForm::new(&catalog());
        form.cursor_next();
        form.cursor_next();
        assert_eq!(form.cursor(), (1, 0));
        form.activate_cursor();
        assert_eq!(form.assemble().graspconf.as_deref(), Some("dg"));
        form.cursor_prev();
        assert_eq!(form.cursor(), (0, 1));
    }
}
