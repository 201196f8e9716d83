//! Tests for the text and JSON renderings of an analysis.

use causal_impact::output::{format_report, format_table, to_json, to_json_pretty};
use causal_impact::{CausalImpact, ImpactAnalysis, ImpactData};

use crate::series::{generate, Recipe};

fn short_analysis() -> ImpactAnalysis {
    let synthetic = generate(Recipe::default(), 21);
    let data = ImpactData::new(
        synthetic.response.clone(),
        synthetic.controls.clone(),
        synthetic.pre_period(),
        synthetic.post_period(),
    )
    .unwrap();
    CausalImpact::new()
        .iterations(200)
        .burn_in(50)
        .seed(5)
        .run(&data)
        .unwrap()
}

#[test]
fn table_lists_totals() {
    let analysis = short_analysis();
    let table = format_table(&analysis);
    assert!(table.starts_with("Posterior inference"));
    assert!(table.contains("Actual"));
    assert!(table.contains("Absolute effect (s.d.)"));
    assert!(table.contains("95% CI"));
    assert!(table.contains("Posterior tail-area probability p:"));
}

#[test]
fn report_mentions_effect() {
    let analysis = short_analysis();
    let report = format_report(&analysis);
    assert!(report.contains("estimated average effect"), "{report}");
}

#[test]
fn json_roundtrip_preserves_totals() {
    let analysis = short_analysis();
    let json = to_json(&analysis).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let p = value["summary"]["post_period"]["p_value"].as_f64().unwrap();
    assert_eq!(Some(p), analysis.p_value());
    assert!(to_json_pretty(&analysis).unwrap().contains('\n'));
}
