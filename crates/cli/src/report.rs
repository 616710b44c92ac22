use anyhow::Result;
use codesift_vector_store::SearchHit;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    results: Vec<RankedHit<'a>>,
}

#[derive(Serialize)]
struct RankedHit<'a> {
    rank: usize,
    #[serde(flatten)]
    hit: &'a SearchHit,
}

pub fn write_json(mut out: impl Write, query: &str, hits: &[SearchHit]) -> Result<()> {
    let output = QueryOutput {
        query,
        results: hits
            .iter()
            .enumerate()
            .map(|(i, hit)| RankedHit { rank: i + 1, hit })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut out, &output)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_text(mut out: impl Write, query: &str, hits: &[SearchHit]) -> Result<()> {
    if hits.is_empty() {
        writeln!(out, "No results for \"{query}\"")?;
        return Ok(());
    }

    writeln!(out, "Top {} results for \"{query}\":", hits.len())?;
    for (i, hit) in hits.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "#{} {} (score {:.4})", i + 1, hit.id, hit.score)?;
        writeln!(out, "   path: {}", or_unknown(hit.field("path")))?;
        writeln!(out, "   type: {}", or_unknown(hit.field("type")))?;
        writeln!(out, "   name: {}", or_unknown(hit.field("name")))?;
    }
    Ok(())
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}
