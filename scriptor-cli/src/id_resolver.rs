//! ID resolver module
//!
//! Resolves job id prefixes to full UUIDs by listing jobs on the server,
//! so users can type short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use scriptor_client::ScriptorClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
///
/// A full UUID is returned as-is without contacting the server.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(client: &ScriptorClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let jobs = client
        .list_jobs(&[], None)
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|job| job.id), &id_or_prefix.to_string())
}

/// Pick the single id starting with `prefix`
fn match_prefix(ids: impl IntoIterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> Uuid {
        Uuid::parse_str(text).unwrap()
    }

    #[test]
    fn test_unique_prefix() {
        let a = id("aa000000-0000-4000-8000-000000000001");
        let b = id("bb000000-0000-4000-8000-000000000002");

        assert_eq!(match_prefix([a, b], "aa").unwrap(), a);
        assert_eq!(match_prefix([a, b], "b").unwrap(), b);
    }

    #[test]
    fn test_no_match() {
        let a = id("aa000000-0000-4000-8000-000000000001");
        let err = match_prefix([a], "cc").unwrap_err();
        assert!(err.to_string().contains("No job found"));
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        let a = id("aa000000-0000-4000-8000-000000000001");
        let b = id("aa000000-0000-4000-8000-000000000002");

        let err = match_prefix([a, b], "aa").unwrap_err().to_string();
        assert!(err.contains("Ambiguous"));
        assert!(err.contains(&a.to_string()));
        assert!(err.contains(&b.to_string()));
    }

    #[tokio::test]
    async fn test_full_uuid_skips_server() {
        // Unreachable server: a full id must resolve without a request
        let client = ScriptorClient::new("http://127.0.0.1:9");
        let full = Uuid::new_v4();

        let resolved = resolve_job_id(&client, &IdOrPrefix::Full(full)).await.unwrap();
        assert_eq!(resolved, full);
    }
}
