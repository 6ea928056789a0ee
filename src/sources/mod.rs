// Sources module
// The official scheme-link registry: what to download, and which links to
// surface next to an answer


use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::retriever::RetrievedPassage;

const DOWNLOAD_TIMEOUT_SECONDS: u64 = 45;

/// One scheme's official links, with hints tying it back to corpus documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeLink {
    pub scheme_id: String,
    pub scheme_name: String,
    pub state: String,
    pub apply_link: String,
    #[serde(default)]
    pub source_links: Vec<String>,
    #[serde(default)]
    pub doc_ids: Vec<String>,
    #[serde(default)]
    pub file_names: Vec<String>,
}

/// The registry shipped with the tool, written on first `sync-sources`.
#[inline]
pub fn builtin_registry() -> Vec<SchemeLink> {
    vec![
        SchemeLink {
            scheme_id: "ap_ntr_bharosa_ssp".to_string(),
            scheme_name: "AP Social Security Pensions (NTR Bharosa)".to_string(),
            state: "ap".to_string(),
            apply_link: "https://gsws-nbm.ap.gov.in/NBM/Home/Main".to_string(),
            source_links: vec![
                "https://sspensions.ap.gov.in/".to_string(),
                "https://sspensions.ap.gov.in/SSP/Documents/GO%20MS%2043%2013.06.2024.pdf"
                    .to_string(),
            ],
            doc_ids: Vec::new(),
            file_names: Vec::new(),
        },
        SchemeLink {
            scheme_id: "tel_kalyana_lakshmi".to_string(),
            scheme_name: "Kalyana Lakshmi / Shaadi Mubarak".to_string(),
            state: "telangana".to_string(),
            apply_link: "https://telanganaepass.cgg.gov.in/KalyanaLakshmiLinks.jsp".to_string(),
            source_links: vec![
                "https://telanganaepass.cgg.gov.in/KalyanLakshmi.do".to_string(),
                "https://wdsc.telangana.gov.in/PwD/GOs/GO.Ms.No.04%20PwD%20Kalyana%20Lashmi%20Pathakam.PDF"
                    .to_string(),
            ],
            doc_ids: Vec::new(),
            file_names: Vec::new(),
        },
        SchemeLink {
            scheme_id: "tel_aasara_pension".to_string(),
            scheme_name: "Aasara Pensions".to_string(),
            state: "telangana".to_string(),
            apply_link:
                "https://www.cheyutha.telangana.gov.in/SSPTG/UserInterface/Portal/GeneralSearch.aspx"
                    .to_string(),
            source_links: vec![
                "https://medak.telangana.gov.in/scheme/aasara-pensions/".to_string(),
            ],
            doc_ids: Vec::new(),
            file_names: Vec::new(),
        },
    ]
}

/// Load the registry; a missing file is an empty registry, not an error.
#[inline]
pub fn load_registry(path: &Path) -> Result<Vec<SchemeLink>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scheme registry: {}", path.display()))?;
    let registry: Vec<SchemeLink> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scheme registry: {}", path.display()))?;

    Ok(registry)
}

#[inline]
pub fn write_registry(path: &Path, registry: &[SchemeLink]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create registry directory: {}", parent.display()))?;
    }

    let content =
        serde_json::to_string_pretty(registry).context("Failed to serialize scheme registry")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write scheme registry: {}", path.display()))?;

    Ok(())
}

/// Deterministically match registry entries against retrieved evidence.
///
/// A scheme matches on document id first, then on file name, and as a last
/// resort when its name occurs inside an evidence file name. Results keep
/// registry order.
#[inline]
pub fn match_links<'a>(
    registry: &'a [SchemeLink],
    evidence: &[RetrievedPassage],
) -> Vec<&'a SchemeLink> {
    let evidence_doc_ids: HashSet<String> =
        evidence.iter().map(|e| e.doc_id.to_lowercase()).collect();
    let evidence_files: HashSet<String> = evidence
        .iter()
        .map(|e| e.file_name.to_lowercase())
        .collect();

    registry
        .iter()
        .filter(|scheme| {
            let doc_ids: Vec<String> = scheme.doc_ids.iter().map(|d| d.to_lowercase()).collect();
            let file_names: Vec<String> =
                scheme.file_names.iter().map(|f| f.to_lowercase()).collect();

            if !doc_ids.is_empty() && doc_ids.iter().any(|d| evidence_doc_ids.contains(d)) {
                return true;
            }

            if !file_names.is_empty() && file_names.iter().any(|f| evidence_files.contains(f)) {
                return true;
            }

            let scheme_name = scheme.scheme_name.to_lowercase();
            !scheme_name.is_empty() && evidence_files.iter().any(|f| f.contains(&scheme_name))
        })
        .collect()
}

/// Download every PDF source link into the corpus directory.
///
/// Non-PDF links are skipped; individual download failures are logged and
/// skipped so one dead link does not block the rest.
#[inline]
pub fn download_sources(registry: &[SchemeLink], corpus_dir: &Path) -> Result<usize> {
    fs::create_dir_all(corpus_dir)
        .with_context(|| format!("Failed to create corpus directory: {}", corpus_dir.display()))?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DOWNLOAD_TIMEOUT_SECONDS)))
        .build()
        .into();

    let mut downloaded = 0;
    for scheme in registry {
        for link in &scheme.source_links {
            if !is_pdf_link(link) {
                continue;
            }

            match download_pdf(&agent, link, corpus_dir) {
                Ok(file_name) => {
                    info!("Downloaded {} for scheme {}", file_name, scheme.scheme_id);
                    downloaded += 1;
                }
                Err(e) => {
                    warn!("Failed to download {}: {}", link, e);
                }
            }
        }
    }

    Ok(downloaded)
}

pub(crate) fn is_pdf_link(link: &str) -> bool {
    link.to_lowercase().ends_with(".pdf")
}

/// Derive the local file name of a download: last path segment, query
/// string stripped.
pub(crate) fn download_file_name(link: &str) -> Option<String> {
    let without_query = link.split('?').next().unwrap_or(link);
    let name = without_query.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn download_pdf(agent: &ureq::Agent, link: &str, corpus_dir: &Path) -> Result<String> {
    let file_name =
        download_file_name(link).ok_or_else(|| anyhow::anyhow!("link has no file name"))?;
    let target = corpus_dir.join(&file_name);

    let bytes = agent
        .get(link)
        .call()
        .and_then(|mut resp| resp.body_mut().read_to_vec())
        .map_err(|e| anyhow::anyhow!("download failed: {}", e))?;

    fs::write(&target, bytes)
        .with_context(|| format!("Failed to write download: {}", target.display()))?;

    Ok(file_name)
}
