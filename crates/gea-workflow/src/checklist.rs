//! Checklist seeding from the phase catalog

use crate::{WorkflowError, WorkflowResult};
use gea_types::{ChecklistItem, Phase, ProjectId, QualityChecklistItem};

/// Operational items for `phase`, in catalog order
///
/// Items of an optional phase are seeded as not required.
pub fn seed_phase(project_id: ProjectId, phase: Phase) -> Vec<ChecklistItem> {
    let def = phase.definition();
    def.default_checklist
        .iter()
        .enumerate()
        .map(|(order, text)| {
            let mut item = ChecklistItem::new(project_id, phase, *text, order as u32);
            item.required = !def.optional;
            item
        })
        .collect()
}

/// GEA review items for `phase`, in catalog order
pub fn seed_quality(project_id: ProjectId, phase: Phase) -> Vec<QualityChecklistItem> {
    phase
        .definition()
        .gea_review_checklist
        .iter()
        .enumerate()
        .map(|(order, text)| QualityChecklistItem::new(project_id, phase, *text, order as u32))
        .collect()
}

/// Whether catalog items for `phase` are already present
pub fn is_seeded(items: &[ChecklistItem], phase: Phase) -> bool {
    items.iter().any(|i| i.phase == phase && !i.custom)
}

pub fn is_quality_seeded(items: &[QualityChecklistItem], phase: Phase) -> bool {
    items.iter().any(|i| i.phase == phase)
}

/// A required custom item appended after the last item of `phase`
pub fn custom_item(
    project_id: ProjectId,
    phase: Phase,
    text: &str,
    existing: &[ChecklistItem],
) -> WorkflowResult<ChecklistItem> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "checklist item text must not be empty".to_string(),
        ));
    }
    let order = existing
        .iter()
        .filter(|i| i.phase == phase)
        .map(|i| i.order + 1)
        .max()
        .unwrap_or(0);

    let mut item = ChecklistItem::new(project_id, phase, text, order);
    item.custom = true;
    item.required = true;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_matches_catalog() {
        let project = ProjectId::generate();
        let items = seed_phase(project, Phase::FIRST);
        assert_eq!(items.len(), Phase::FIRST.definition().default_checklist.len());
        assert!(items.iter().all(|i| i.required && !i.custom && !i.completed));
        assert_eq!(items[0].order, 0);
        assert_eq!(items.last().unwrap().order as usize, items.len() - 1);
    }

    #[test]
    fn test_optional_phase_items_not_required() {
        let preliminary = Phase::from_key("preliminary").unwrap();
        let items = seed_phase(ProjectId::generate(), preliminary);
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| !i.required));
    }

    #[test]
    fn test_custom_item_appended_after_max_order() {
        let project = ProjectId::generate();
        let existing = seed_phase(project, Phase::FIRST);
        let item = custom_item(project, Phase::FIRST, "  Extra evidence  ", &existing).unwrap();
        assert_eq!(item.order as usize, existing.len());
        assert_eq!(item.text, "Extra evidence");
        assert!(item.custom && item.required);
    }

    #[test]
    fn test_custom_item_on_empty_phase_and_seed_detection() {
        let project = ProjectId::generate();
        let phase = Phase::new(5).unwrap();
        let item = custom_item(project, phase, "Site safety induction", &[]).unwrap();
        assert_eq!(item.order, 0);
        assert!(!is_seeded(&[item], phase));
        assert!(custom_item(project, phase, "   ", &[]).is_err());
    }
}
