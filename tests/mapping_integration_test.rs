//! Mapping profiles applied through full export jobs

mod common;

use bibexport::adapters::catalog::JsonCatalog;
use bibexport::core::export::ExportRequest;
use bibexport::domain::{JobStatus, MappingProfile};
use bibexport::marc::{iso2709, mnemonic::to_mnemonic};
use common::{instance, marc_content, record_id, stored_bib, TestEnv};
use serde_json::json;
use std::sync::Arc;

fn profile(record_types: &[&str], transformations: serde_json::Value) -> MappingProfile {
    serde_json::from_value(json!({
        "id": "8a1c2f3e-5b6d-4e7f-9a0b-1c2d3e4f5a6b",
        "name": "Custom profile",
        "recordTypes": record_types,
        "transformations": transformations,
        "outputFormat": "MARC",
        "default": false
    }))
    .unwrap()
}

#[tokio::test]
async fn test_custom_profile_generates_only_its_fields() {
    let catalog = JsonCatalog::new().with_instances(vec![instance(1, "Custom title")]);
    let env = TestEnv::new(Arc::new(catalog), 10);
    let file = env.write_ids("ids.csv", &[record_id(1)]);

    let profile = profile(
        &["INSTANCE"],
        json!([
            {
                "fieldId": "instance.title",
                "path": "$.instance.title",
                "transformation": "24510$a",
                "recordType": "INSTANCE"
            },
            {
                "fieldId": "instance.hrid",
                "path": "$.instance.hrid",
                "transformation": "001",
                "recordType": "INSTANCE"
            }
        ]),
    );
    let job = env
        .service
        .orchestrator
        .export(ExportRequest::new(file, profile))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let bytes = env.read_output(&job.exported_files[0].file_name);
    let text = to_mnemonic(&iso2709::read_record(&bytes).unwrap());
    let fields: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(fields, vec!["=001  in00000000001", "=245  10$aCustom title"]);
}

#[tokio::test]
async fn test_holdings_rules_overlay_stored_record() {
    let catalog = JsonCatalog::new()
        .with_instances(vec![instance(1, "Inventory title")])
        .with_holdings(vec![json!({
            "id": "7c3e1d2a-0000-4000-8000-000000000001",
            "hrid": "ho00000000001",
            "instanceId": record_id(1),
            "callNumber": "QA76 .R87"
        })])
        .with_marc_records(vec![stored_bib(1, marc_content("in-srs-1", "Stored title"))]);
    let env = TestEnv::new(Arc::new(catalog), 10);
    let file = env.write_ids("ids.csv", &[record_id(1)]);

    let profile = profile(
        &["INSTANCE", "HOLDINGS"],
        json!([
            {
                "fieldId": "holdings.callnumber",
                "path": "$.holdings[*].callNumber",
                "transformation": "900  $a",
                "recordType": "HOLDINGS"
            }
        ]),
    );
    let job = env
        .service
        .orchestrator
        .export(ExportRequest::new(file, profile))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let bytes = env.read_output(&job.exported_files[0].file_name);
    let record = iso2709::read_record(&bytes).unwrap();
    assert_eq!(record.control_field("001"), Some("in-srs-1"));
    let call_number = record.data_fields("900").next().unwrap();
    assert_eq!(call_number.subfield('a'), Some("QA76 .R87"));
    assert_eq!(
        record.data_fields("245").next().unwrap().subfield('a'),
        Some("Stored title")
    );
}

#[tokio::test]
async fn test_holdings_export_uses_default_holdings_rules() {
    let holdings: Vec<_> = (1..=2)
        .map(|n| {
            json!({
                "id": record_id(100 + n),
                "hrid": format!("ho{n:011}"),
                "instanceId": record_id(n),
                "callNumber": format!("CN {n}")
            })
        })
        .collect();
    let catalog = JsonCatalog::new()
        .with_instances(vec![instance(1, "One"), instance(2, "Two")])
        .with_holdings(holdings);
    let env = TestEnv::new(Arc::new(catalog), 10);
    let file = env.write_ids("holdings.csv", &[record_id(101), record_id(102)]);

    let mut holdings_profile = MappingProfile::default_instance();
    holdings_profile.record_types = vec![bibexport::domain::RecordType::Holdings];
    let job = env
        .service
        .orchestrator
        .export(ExportRequest::new(file, holdings_profile))
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress.exported, 2);

    let bytes = env.read_output(&job.exported_files[0].file_name);
    let records = common::split_records(&bytes);
    assert_eq!(records.len(), 2);
    let first = iso2709::read_record(records[0]).unwrap();
    assert_eq!(first.control_field("001"), Some("ho00000000001"));
    assert_eq!(first.control_field("004"), Some("in00000000001"));
    assert_eq!(
        first.data_fields("852").next().unwrap().subfield('h'),
        Some("CN 1")
    );
}

#[tokio::test]
async fn test_default_rules_produce_known_record() {
    let catalog = JsonCatalog::new().with_instances(vec![json!({
        "id": record_id(1),
        "hrid": "in00000000001",
        "title": "The Rust programming language",
        "languages": ["eng"],
        "identifiers": [
            {"identifierTypeId": "8261054f-be78-422d-bd51-4ed9f33c3422", "value": "9781718503106"},
            {"identifierTypeId": "913300b2-03ed-469a-8179-c1092c991227", "value": "1234-5678"},
            {"identifierTypeId": "7e591197-f335-4afb-bc6d-a6d76ca3bace", "value": "ocm01234567"}
        ],
        "contributors": [
            {"name": "Klabnik, Steve", "primary": true},
            {"name": "Nichols, Carol", "primary": false}
        ],
        "publication": [
            {"place": "San Francisco", "publisher": "No Starch Press", "dateOfPublication": "2019"}
        ],
        "electronicAccess": [
            {
                "uri": "https://example.org/book",
                "linkText": "Full text",
                "relationshipId": "f5d0068e-6272-458e-8a81-b85e7b9a14aa"
            },
            {
                "uri": "https://example.org/toc",
                "publicNote": "Contents",
                "relationshipId": "5bfe1b7b-f151-4501-8cfa-23b321d5cd1e"
            },
            {
                "uri": "https://example.org/other",
                "relationshipId": "00000000-0000-4000-8000-0000000000ff"
            }
        ],
        "notes": [
            {"note": "Includes index.", "staffOnly": false},
            {"note": "Shelved in the back office", "staffOnly": true}
        ],
        "metadata": {
            "createdDate": "2020-01-15T10:00:00.000+00:00",
            "updatedDate": "2021-03-02T08:30:00.000+00:00"
        }
    })]);
    let env = TestEnv::new(Arc::new(catalog), 10);
    let file = env.write_ids("ids.csv", &[record_id(1)]);

    let job = env
        .service
        .orchestrator
        .export(ExportRequest::new(file, MappingProfile::default_instance()))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress.exported, 1);

    let bytes = env.read_output(&job.exported_files[0].file_name);
    assert_eq!(bytes.len(), 538);
    assert_eq!(&bytes[..24], b"00538nam a2200181 a 4500");
    assert_eq!(bytes.last(), Some(&0x1D));

    let text = to_mnemonic(&iso2709::read_record(&bytes).unwrap());
    let expected = [
        r"=LDR  00538nam a2200181 a 4500",
        r"=001  in00000000001",
        r"=005  20210302083000.0",
        r"=008  200115s2019\\\\xx\\\\\\\\\\\\\\\\\\eng\d",
        r"=020  \\$a9781718503106",
        r"=022  \\$a1234-5678",
        r"=100  1\$aKlabnik, Steve",
        r"=245  00$aThe Rust programming language",
        r"=264  \1$aSan Francisco$bNo Starch Press$c2019",
        r"=500  \\$aIncludes index.",
        r"=700  1\$aNichols, Carol",
        r"=856  40$uhttps://example.org/book$yFull text",
        r"=856  41$uhttps://example.org/toc$zContents",
        r"=999  ff$i00000000-0000-4000-8000-000000000001",
    ];
    assert_eq!(text.lines().collect::<Vec<_>>(), expected);
}
