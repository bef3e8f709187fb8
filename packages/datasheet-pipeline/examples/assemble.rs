//! End-to-end demo with in-process mocks.
//!
//! Wires a single-rung ladder serving canned pages and a scripted
//! extraction service, then runs a two-product batch and prints the
//! reconciled table. Run with:
//!
//! ```sh
//! RUST_LOG=datasheet_pipeline=debug cargo run --example assemble
//! ```

use std::sync::Arc;

use datasheet_pipeline::testing::{ScriptedExtractor, StaticStrategy};
use datasheet_pipeline::{
    CandidateSource, DomainEntry, DomainPolicy, FetchLadder, FetchMethod, Pipeline, ProductQuery,
    PropertyDefinition, TracingAuditSink, FETCHED_SOURCES_PROPERTY,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datasheet_pipeline=info".into()),
        )
        .init();

    let filler = "Technische Daten und weitere Produktinformationen. ".repeat(40);
    let shop_a = format!("quelle-a {}", filler);
    let shop_b = format!("quelle-b {}", filler);
    let manufacturer = format!("quelle-hersteller {}", filler);

    let ladder = Arc::new(FetchLadder::new(vec![Arc::new(StaticStrategy::serving(
        FetchMethod::FastStatic,
        &[
            ("https://shop-a.example.com/ofenx", shop_a.as_str()),
            ("https://shop-b.example.com/ofenx", shop_b.as_str()),
            ("https://hersteller.example.de/ofenx", manufacturer.as_str()),
        ],
    ))]));

    let extractor = Arc::new(
        ScriptedExtractor::new()
            .with_response(
                "quelle-a",
                vec![("Gewicht", "12 kg"), ("Leistung", "8 kW"), ("Farbe", "Anthrazit")],
            )
            .with_response(
                "quelle-b",
                vec![("Gewicht", "12kg"), ("Leistung", "8,5 kW"), ("Farbe", "not found")],
            )
            .with_response(
                "quelle-hersteller",
                vec![("Gewicht", "12 kg"), ("Leistung", "8 kW"), ("Farbe", "not found")],
            ),
    );

    let policy = DomainPolicy::from_entries(&[
        DomainEntry::trusted("hersteller.example.de"),
        DomainEntry::excluded("spam.example.net"),
    ]);

    let pipeline =
        Pipeline::new(ladder, policy, extractor).with_audit(Arc::new(TracingAuditSink));

    let schema = vec![
        PropertyDefinition::new("Gewicht").with_order_index(0).required(),
        PropertyDefinition::new("Leistung").with_order_index(1),
        PropertyDefinition::new("Farbe").with_order_index(2),
    ];

    let queries = vec![
        ProductQuery::new("Ofen Modell X")
            .with_article_number("OFX-100")
            .with_candidates(vec![
                CandidateSource::new("https://shop-a.example.com/ofenx"),
                CandidateSource::new("https://shop-b.example.com/ofenx"),
                CandidateSource::new("https://hersteller.example.de/ofenx"),
                CandidateSource::new("https://spam.example.net/ofenx"),
            ]),
        ProductQuery::new("Ofen Modell Y")
            .with_candidate(CandidateSource::new("https://unknown.example.com/ofeny")),
    ];

    let response = pipeline.run_batch(queries, &schema).await;

    println!("status: {:?} ({})", response.search_status, response.status_message);
    for product in &response.products {
        println!("\n{}", product.product_name);
        let mut ordered: Vec<_> = schema.iter().collect();
        ordered.sort_by_key(|d| d.order_index);
        for definition in ordered {
            let result = &product.properties[&definition.name];
            println!(
                "  {:10} {:28} confidence {:3}  ({} source(s))",
                definition.name,
                if result.value.is_empty() { "-" } else { result.value.as_str() },
                result.confidence,
                result.consistency_count,
            );
        }
        let meta = &product.properties[FETCHED_SOURCES_PROPERTY];
        println!("  fetched sources: {}", meta.consistency_count);
    }
}
