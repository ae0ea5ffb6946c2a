//! Integration tests for catalog building against describe-document fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use ocean_common::{AxisRole, DimensionExtent};
use schema_catalog::{
    CatalogBuilder, CatalogError, DescribeDocumentProvider, DescribeResponse, DocumentSource,
    MetadataProvider, TargetSpec,
};
use test_utils::{
    currents_describe_document, describe_document, explicit_coordinate, merge_documents,
    regular_coordinate, service, variable, CURRENTS_DATASET_ID, CURRENTS_PRODUCT_ID,
    GEO_SERIES_URL, TIME_SERIES_URL,
};

fn provider_for(document: serde_json::Value) -> Arc<dyn MetadataProvider> {
    let response: DescribeResponse = serde_json::from_value(document).unwrap();
    Arc::new(DescribeDocumentProvider::from_document(response))
}

fn target(dataset_id: &str, service: &str) -> TargetSpec {
    TargetSpec {
        dataset_id: dataset_id.to_string(),
        label: format!("{} label", dataset_id),
        variables: vec!["uo".to_string(), "vo".to_string()],
        preferred_service: service.to_string(),
    }
}

/// Provider that fails every query.
struct FailingProvider;

#[async_trait]
impl MetadataProvider for FailingProvider {
    async fn describe(&self, _dataset_id: &str) -> schema_catalog::Result<DescribeResponse> {
        Err(CatalogError::provider("connection reset"))
    }
}

#[tokio::test]
async fn test_entry_for_preferred_service() {
    let builder = CatalogBuilder::new(provider_for(currents_describe_document()));

    let entry = builder
        .build_entry(&target(CURRENTS_DATASET_ID, "arco-time-series"))
        .await
        .unwrap()
        .expect("entry");

    assert_eq!(entry.id, CURRENTS_DATASET_ID);
    assert_eq!(entry.product, CURRENTS_PRODUCT_ID);
    assert_eq!(entry.zarr_url, TIME_SERIES_URL);

    // vsdx is reported but not requested
    let names: Vec<&str> = entry.variables.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["uo", "vo"]);
    assert_eq!(
        entry.variables["uo"].standard_name.as_deref(),
        Some("eastward_sea_water_velocity")
    );

    let latitude = &entry.dimensions["latitude"];
    assert_eq!(latitude.axis, AxisRole::Latitude);
    assert_eq!(latitude.size, Some(2041));
    assert_eq!(latitude.chunk_size, Some(32));
    assert!(matches!(latitude.extent, DimensionExtent::Range { .. }));

    assert_eq!(entry.dimensions["longitude"].size, Some(4320));
    assert_eq!(entry.dimensions["depth"].size, Some(4));
    assert_eq!(entry.dimensions["time"].axis, AxisRole::Time);
}

#[tokio::test]
async fn test_geo_series_variant() {
    let builder = CatalogBuilder::new(provider_for(currents_describe_document()));
    let entry = builder
        .build_entry(&target(CURRENTS_DATASET_ID, "arco-geo-series"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.zarr_url, GEO_SERIES_URL);
    assert_eq!(entry.dimensions["latitude"].chunk_size, Some(2048));
}

#[tokio::test]
async fn test_missing_service_is_absent_and_order_preserved() {
    let second = describe_document(
        "OTHER_PRODUCT",
        "other_dataset",
        vec![service(
            "arco-geo-series",
            Some("zarr"),
            "https://example.org/other.zarr",
            test_utils::currents_variables(64),
        )],
    );
    let provider = provider_for(merge_documents(&[currents_describe_document(), second]));
    let builder = CatalogBuilder::new(provider);

    let targets = vec![
        target("other_dataset", "arco-geo-series"),
        target(CURRENTS_DATASET_ID, "arco-nonexistent"),
        target(CURRENTS_DATASET_ID, "arco-geo-series"),
    ];
    let catalog = builder.build_catalog(&targets).await;

    let ids: Vec<&str> = catalog.datasets.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["other_dataset", CURRENTS_DATASET_ID]);
    assert_eq!(catalog.datasets[0].product, "OTHER_PRODUCT");
}

#[tokio::test]
async fn test_non_zarr_service_yields_empty_catalog() {
    let builder = CatalogBuilder::new(provider_for(currents_describe_document()));
    let catalog = builder
        .build_catalog(&[target(CURRENTS_DATASET_ID, "original-files")])
        .await;

    assert!(catalog.datasets.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&catalog.to_json_pretty().unwrap()).unwrap();
    let stamp = json["generated"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    assert_eq!(json["datasets"], json!([]));
}

#[tokio::test]
async fn test_unknown_dataset_is_absent() {
    let builder = CatalogBuilder::new(provider_for(currents_describe_document()));
    let entry = builder
        .build_entry(&target("unknown_dataset", "arco-geo-series"))
        .await
        .unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn test_grid_mismatch_is_rejected_and_skipped() {
    let mut vo_coordinates = test_utils::currents_coordinates(32);
    vo_coordinates.pop();
    vo_coordinates.push(regular_coordinate(
        "lon",
        "x",
        "degrees_east",
        -180.0,
        179.91667,
        0.083333,
        32,
    ));

    let document = describe_document(
        CURRENTS_PRODUCT_ID,
        CURRENTS_DATASET_ID,
        vec![service(
            "arco-geo-series",
            Some("zarr"),
            GEO_SERIES_URL,
            vec![
                variable("uo", "eastward_sea_water_velocity", "m s-1", test_utils::currents_coordinates(32)),
                variable("vo", "northward_sea_water_velocity", "m s-1", vo_coordinates),
            ],
        )],
    );
    let builder = CatalogBuilder::new(provider_for(document));
    let t = target(CURRENTS_DATASET_ID, "arco-geo-series");

    let err = builder.build_entry(&t).await.unwrap_err();
    assert!(matches!(err, CatalogError::GridMismatch { ref variable, .. } if variable == "vo"));

    let catalog = builder.build_catalog(&[t]).await;
    assert!(catalog.datasets.is_empty());
}

#[tokio::test]
async fn test_provider_fault_is_skipped() {
    let builder = CatalogBuilder::new(Arc::new(FailingProvider));
    let err = builder
        .build_entry(&target(CURRENTS_DATASET_ID, "arco-geo-series"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Provider(_)));

    let catalog = builder
        .build_catalog(&[target(CURRENTS_DATASET_ID, "arco-geo-series")])
        .await;
    assert!(catalog.datasets.is_empty());
}

#[tokio::test]
async fn test_size_rules() {
    let coordinates = vec![
        regular_coordinate("time", "t", "hours", 0.0, 10.0, 2.0, 1),
        explicit_coordinate("depth", "z", "m", &[1.0, 2.0, 3.0], 1),
        regular_coordinate("latitude", "y", "degrees_north", 0.0, 1.0, 0.0, 1),
        json!({"coordinate_id": "longitude", "axis": "x", "minimum_value": 0.0, "maximum_value": 1.0}),
    ];
    let document = describe_document(
        "P",
        "sized",
        vec![service(
            "arco-geo-series",
            Some("ZARR"),
            "https://example.org/sized.zarr",
            vec![
                variable("uo", "eastward_sea_water_velocity", "m s-1", coordinates.clone()),
                variable("vo", "northward_sea_water_velocity", "m s-1", coordinates),
            ],
        )],
    );
    let builder = CatalogBuilder::new(provider_for(document));
    let entry = builder
        .build_entry(&target("sized", "arco-geo-series"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(entry.dimensions["time"].size, Some(6));
    assert_eq!(entry.dimensions["depth"].size, Some(3));
    assert_eq!(entry.dimensions["latitude"].size, None);
    assert_eq!(entry.dimensions["longitude"].size, None);
}

#[tokio::test]
async fn test_catalog_written_from_file_document() {
    let dir = tempfile::tempdir().unwrap();
    let describe_path = dir.path().join("describe.json");
    std::fs::write(
        &describe_path,
        serde_json::to_string(&currents_describe_document()).unwrap(),
    )
    .unwrap();

    let provider = Arc::new(DescribeDocumentProvider::new(DocumentSource::File(
        describe_path,
    )));
    let builder = CatalogBuilder::new(provider);
    let catalog = builder
        .build_catalog(&[target(CURRENTS_DATASET_ID, "arco-geo-series")])
        .await;

    let out = dir.path().join("public/data/catalog.json");
    catalog.write_to(&out).unwrap();

    let restored = schema_catalog::Catalog::read_from(&out).unwrap();
    assert_eq!(restored.generated, catalog.generated);
    assert_eq!(restored.datasets.len(), 1);
    assert_eq!(restored.datasets[0].zarr_url, GEO_SERIES_URL);
    assert_eq!(restored.datasets[0].dimensions["latitude"].size, Some(2041));
}
