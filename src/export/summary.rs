//! Derived summary documents and README text for export archives.
//!
//! Layout and field names here are load-bearing: archives produced by
//! earlier versions of the studio carry the same documents, and downstream
//! consumers parse them.

use chrono::Local;
use serde_json::{json, Value};

use crate::library::CharacterRecord;

pub const EXPORT_TOOL: &str = "AI Character Creation Studio";

/// Per-character summary document (`character_summary.json`).
pub fn character_summary(record: &CharacterRecord) -> Value {
    json!({
        "character_info": {
            "session_id": record.session_id,
            "character_id": record.character_id,
            "creation_date": record.creation_date.to_rfc3339(),
            "prompt": record.prompt,
        },
        "image_statistics": {
            "base_image": if record.has_base_image() { 1 } else { 0 },
            "realistic_variations": record.realistic_count,
            "styled_images": record.styled_counts,
            "total_images": record.total_images,
        },
        "character_config": record.base_metadata.as_ref()
            .and_then(|m| m.get("parameters"))
            .cloned()
            .unwrap_or_else(|| json!({})),
        "generation_metadata": record.base_metadata.clone().unwrap_or_else(|| json!({})),
        "export_info": {
            "export_date": Local::now().to_rfc3339(),
            "export_tool": EXPORT_TOOL,
        },
    })
}

/// Batch-level summary document (`batch_summary.json`).
pub fn batch_summary(records: &[CharacterRecord]) -> Value {
    let total_images: usize = records.iter().map(|r| r.total_images).sum();
    let total_realistic: usize = records.iter().map(|r| r.realistic_count).sum();

    let mut style_totals = std::collections::BTreeMap::new();
    for record in records {
        for (style, count) in &record.styled_counts {
            *style_totals.entry(style.clone()).or_insert(0usize) += count;
        }
    }

    let earliest = records.iter().map(|r| r.creation_date).min();
    let latest = records.iter().map(|r| r.creation_date).max();

    json!({
        "batch_info": {
            "total_characters": records.len(),
            "export_date": Local::now().to_rfc3339(),
            "export_tool": EXPORT_TOOL,
        },
        "aggregate_statistics": {
            "total_images": total_images,
            "total_realistic_variations": total_realistic,
            "style_breakdown": style_totals,
            "creation_date_range": {
                "earliest": earliest.map(|d| d.to_rfc3339()),
                "latest": latest.map(|d| d.to_rfc3339()),
            },
        },
        "characters": records.iter().map(|r| json!({
            "session_id": r.session_id,
            "character_id": r.character_id,
            "creation_date": r.creation_date.to_rfc3339(),
            "image_count": r.total_images,
            "prompt": r.prompt,
        })).collect::<Vec<_>>(),
    })
}

/// README.txt body for a single-character archive.
pub fn character_readme(record: &CharacterRecord) -> String {
    let styles: Vec<String> = record
        .styled_counts
        .iter()
        .map(|(style, count)| format!("{}: {}", style, count))
        .collect();

    format!(
        "{tool} - Character Export\n\
         ==================================================\n\
         \n\
         Character Information:\n\
         - Session ID: {session}\n\
         - Character ID: {character}\n\
         - Creation Date: {created}\n\
         - Total Images: {total}\n\
         \n\
         Generated Images:\n\
         - Base Character: {base}\n\
         - Realistic Variations: {realistic}\n\
         - Styled Images: {{{styles}}}\n\
         \n\
         Folder Structure:\n\
         ├── Base-Character.png (or Base-Image.png)\n\
         ├── base_character_metadata.json\n\
         ├── ConsistencyTests/\n\
         │   ├── Realistic_001.png\n\
         │   ├── Realistic_002.png\n\
         │   └── ... (metadata files)\n\
         └── Styles/\n\
             ├── Studio Ghibli/\n\
             └── Rick & Morty/\n\
         \n\
         Files Description:\n\
         - character_summary.json: Complete character metadata and statistics\n\
         - ConsistencyTests/: Character variations maintaining consistency\n\
         - Styles/: Stylized versions using different artistic styles\n\
         - *_metadata.json: Generation parameters and API responses\n\
         \n\
         Generated by: {tool}\n\
         Export Date: {exported}\n",
        tool = EXPORT_TOOL,
        session = record.session_id,
        character = record.character_id,
        created = record.creation_date.format("%Y-%m-%d %H:%M:%S"),
        total = record.total_images,
        base = if record.has_base_image() { "yes" } else { "no" },
        realistic = record.realistic_count,
        styles = styles.join(", "),
        exported = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

/// README.txt body for a batch archive.
pub fn batch_readme(records: &[CharacterRecord]) -> String {
    let total_images: usize = records.iter().map(|r| r.total_images).sum();
    let character_list: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "- {} ({} images) - {}",
                r.character_id,
                r.total_images,
                r.creation_date.format("%Y-%m-%d")
            )
        })
        .collect();

    format!(
        "{tool} - Batch Character Export\n\
         ========================================================\n\
         \n\
         Batch Information:\n\
         - Total Characters: {count}\n\
         - Total Images: {total}\n\
         - Export Date: {exported}\n\
         \n\
         Included Characters:\n\
         {characters}\n\
         \n\
         Folder Structure:\n\
         ├── batch_summary.json (batch metadata)\n\
         ├── README.txt (this file)\n\
         └── [Session_ID]_[Character_ID]/\n\
             ├── Base-Character.png\n\
             ├── character_summary.json\n\
             ├── ConsistencyTests/\n\
             └── Styles/\n\
         \n\
         Each character folder contains:\n\
         - Base character image\n\
         - Realistic variations (consistency tests)\n\
         - Styled versions\n\
         - Complete metadata and generation parameters\n\
         \n\
         Generated by: {tool}\n\
         Export Date: {exported}\n",
        tool = EXPORT_TOOL,
        count = records.len(),
        total = total_images,
        characters = character_list.join("\n"),
        exported = Local::now().format("%Y-%m-%d %H:%M:%S"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn record(id: &str, realistic: usize, styles: &[(&str, usize)]) -> CharacterRecord {
        let mut styled_counts = BTreeMap::new();
        for (style, count) in styles {
            styled_counts.insert(style.to_string(), *count);
        }
        let total = realistic + styles.iter().map(|(_, c)| c).sum::<usize>();
        CharacterRecord {
            session_id: "Session_001".to_string(),
            character_id: id.to_string(),
            directory: PathBuf::from("/tmp/unused"),
            creation_date: chrono::Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            base_image_path: None,
            base_metadata: Some(json!({"prompt": "a pilot", "success": true})),
            prompt: Some("a pilot".to_string()),
            realistic_count: realistic,
            styled_counts,
            total_images: total,
        }
    }

    #[test]
    fn test_character_summary_fields() {
        let summary = character_summary(&record("Char_001", 2, &[("ghibli", 1)]));

        assert_eq!(summary["character_info"]["character_id"], "Char_001");
        assert_eq!(summary["character_info"]["prompt"], "a pilot");
        assert_eq!(summary["image_statistics"]["base_image"], 0);
        assert_eq!(summary["image_statistics"]["realistic_variations"], 2);
        assert_eq!(summary["image_statistics"]["styled_images"]["ghibli"], 1);
        assert_eq!(summary["image_statistics"]["total_images"], 3);
        assert_eq!(summary["generation_metadata"]["success"], true);
        assert_eq!(summary["export_info"]["export_tool"], EXPORT_TOOL);
    }

    #[test]
    fn test_summary_tolerates_missing_metadata() {
        let mut rec = record("Char_002", 1, &[]);
        rec.base_metadata = None;
        rec.prompt = None;

        let summary = character_summary(&rec);
        assert!(summary["generation_metadata"].as_object().unwrap().is_empty());
        assert!(summary["character_info"]["prompt"].is_null());
    }

    #[test]
    fn test_batch_summary_aggregates() {
        let a = record("Char_A", 2, &[("ghibli", 2)]);
        let b = record("Char_B", 1, &[("ghibli", 1), ("rick_morty", 4)]);

        let summary = batch_summary(&[a, b]);
        let stats = &summary["aggregate_statistics"];
        assert_eq!(summary["batch_info"]["total_characters"], 2);
        assert_eq!(stats["total_images"], 10);
        assert_eq!(stats["total_realistic_variations"], 3);
        assert_eq!(stats["style_breakdown"]["ghibli"], 3);
        assert_eq!(stats["style_breakdown"]["rick_morty"], 4);
        assert_eq!(summary["characters"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_readmes_mention_identity() {
        let rec = record("Char_007", 1, &[("ghibli", 1)]);
        let single = character_readme(&rec);
        assert!(single.contains("Char_007"));
        assert!(single.contains("Session_001"));
        assert!(single.contains("ghibli: 1"));

        let batch = batch_readme(&[rec]);
        assert!(batch.contains("Total Characters: 1"));
        assert!(batch.contains("Char_007"));
    }
}
