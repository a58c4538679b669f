//! Command execution against an [`AnnotationService`].

use std::path::Path;

use anyhow::Context;
use serde_json::{Value, json};
use tracing::debug;

use helios_annotations::AnnotationService;
use helios_annotations::types::{HistoryQuery, ImageQuery, SearchQuery};

use crate::config::Command;

/// What a command produced.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// JSON to print.
    Found(Value),
    /// Nothing matched.
    NotFound,
}

/// Runs one command.
pub async fn execute(service: &AnnotationService, command: Command) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::Create {
            image_id,
            user_id,
            payload,
        } => {
            let payload = read_payload(&payload)?;
            let created = service.create(&image_id, payload, &user_id).await?;
            Outcome::Found(serde_json::to_value(created)?)
        }

        Command::Get {
            image_id,
            version,
            include_deleted,
            no_metadata,
        } => {
            let mut query = ImageQuery::new()
                .include_deleted(include_deleted)
                .include_metadata(!no_metadata);
            if let Some(version) = version {
                query = query.version(version);
            }
            match service.get_for_image(&image_id, &query).await? {
                Some(records) => Outcome::Found(serde_json::to_value(records)?),
                None => Outcome::NotFound,
            }
        }

        Command::Show { record_id } => match service.get_by_id(&record_id).await? {
            Some(record) => Outcome::Found(serde_json::to_value(record)?),
            None => Outcome::NotFound,
        },

        Command::History {
            image_id,
            page,
            limit,
            include_deleted,
        } => {
            let mut query = HistoryQuery::new()
                .include_deleted(include_deleted)
                .page(page);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            let records = service.get_history(&image_id, &query).await?;
            Outcome::Found(serde_json::to_value(records)?)
        }

        Command::Search {
            study_id,
            patient_id,
            page,
            limit,
            include_deleted,
        } => {
            let mut query = SearchQuery::new().include_deleted(include_deleted).page(page);
            if let Some(study_id) = study_id {
                query = query.study_id(study_id);
            }
            if let Some(patient_id) = patient_id {
                query = query.patient_id(patient_id);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            let page = service.search(&query).await?;
            Outcome::Found(serde_json::to_value(page)?)
        }

        Command::Delete { record_id, user_id } => {
            if service.soft_delete(&record_id, &user_id).await? {
                Outcome::Found(json!({ "id": record_id, "deleted": true }))
            } else {
                Outcome::NotFound
            }
        }

        Command::Purge { image_id } => {
            let removed = service.delete_all_for_image(&image_id).await?;
            Outcome::Found(json!({ "imageId": image_id, "removed": removed }))
        }
    };

    Ok(outcome)
}

/// Parses a payload argument: inline JSON, or `@path` naming a JSON file.
pub fn read_payload(arg: &str) -> anyhow::Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => {
            debug!(path, "Reading payload file");
            std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("Failed to read payload file {path}"))?
        }
        None => arg.to_string(),
    };

    serde_json::from_str(&text).context("Payload is not valid JSON")
}
