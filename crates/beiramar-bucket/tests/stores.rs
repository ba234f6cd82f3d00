use beiramar_bucket::{object_uri, BlobStore, BucketError, LocalBlobStore, MemoryBlobStore};
use bytes::Bytes;

#[tokio::test]
async fn memory_store_round_trips_objects_per_bucket() {
    let store = MemoryBlobStore::new();
    store
        .put_object("trusted", "clima/clima.csv", Bytes::from_static(b"a,b\n1,2\n"), "text/csv")
        .await
        .unwrap();

    let data = store.get_object("trusted", "clima/clima.csv").await.unwrap();
    assert_eq!(&data[..], b"a,b\n1,2\n");

    let missing = store.get_object("refined", "clima/clima.csv").await;
    assert!(matches!(missing, Err(BucketError::NotFound { .. })));
}

#[tokio::test]
async fn local_store_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalBlobStore::new(dir.path());

    store
        .put_object(
            "refined-beira-mar",
            "clinica_com_clima/cancelamentos_com_clima.csv",
            Bytes::from_static(b"X\n1\n"),
            "text/csv",
        )
        .await
        .unwrap();

    let on_disk = dir
        .path()
        .join("refined-beira-mar/clinica_com_clima/cancelamentos_com_clima.csv");
    assert!(on_disk.exists());

    let data = store
        .get_object("refined-beira-mar", "clinica_com_clima/cancelamentos_com_clima.csv")
        .await
        .unwrap();
    assert_eq!(&data[..], b"X\n1\n");
}

#[tokio::test]
async fn local_store_reports_missing_and_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalBlobStore::new(dir.path());

    let missing = store.get_object("raw", "nope.csv").await;
    assert!(matches!(missing, Err(BucketError::NotFound { .. })));

    let escaping = store.get_object("raw", "../secret.csv").await;
    assert!(matches!(escaping, Err(BucketError::InvalidKey(_))));
}

#[test]
fn object_uri_uses_s3_scheme() {
    assert_eq!(
        object_uri("trusted-beira-mar", "clima/clima.csv"),
        "s3://trusted-beira-mar/clima/clima.csv"
    );
}
