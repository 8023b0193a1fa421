//! Placeholder-id cleanup for rows created interactively in a form and saved
//! in one request. Identifiers carrying the temporary marker prefix are
//! replaced with real ones before anything reaches storage.

use entity::project_survey::SurveyItem;
use entity::quotation::ServiceLine;
use uuid::Uuid;

pub const TEMP_ID_PREFIX: &str = "tmp-";

fn is_placeholder(id: &str) -> bool {
    id.is_empty() || id.starts_with(TEMP_ID_PREFIX)
}

pub fn assign_line_ids(lines: &mut [ServiceLine]) {
    for line in lines {
        if is_placeholder(&line.id) {
            line.id = Uuid::new_v4().to_string();
        }
    }
}

pub fn assign_item_ids(items: &mut [SurveyItem]) {
    for item in items {
        if is_placeholder(&item.id) {
            item.id = Uuid::new_v4().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_ids_are_replaced() {
        let mut lines = vec![
            ServiceLine {
                id: "tmp-17".into(),
                ..ServiceLine::default()
            },
            ServiceLine {
                id: String::new(),
                ..ServiceLine::default()
            },
            ServiceLine {
                id: "f2f1b9a0-0000-0000-0000-000000000001".into(),
                ..ServiceLine::default()
            },
        ];
        assign_line_ids(&mut lines);
        assert!(!lines[0].id.starts_with(TEMP_ID_PREFIX));
        assert!(!lines[1].id.is_empty());
        assert_eq!(lines[2].id, "f2f1b9a0-0000-0000-0000-000000000001");
    }

    #[test]
    fn survey_items_get_real_ids_too() {
        let mut items = vec![SurveyItem {
            id: "tmp-row-1".into(),
            ..SurveyItem::default()
        }];
        assign_item_ids(&mut items);
        assert!(uuid::Uuid::parse_str(&items[0].id).is_ok());
    }
}
