// ==========================================
// ImportApi 集成测试
// ==========================================
// 测试目标: 共享连接上的导入/确认流程、导出后重新导入的幂等性、
//           按文件名识别类型
// ==========================================


use meals_bulk_import::api::{ApiError, ImportApi};
use meals_bulk_import::config::ImportConfig;
use meals_bulk_import::domain::{FileType, Ingredient, Sku};
use meals_bulk_import::importer::TtlTransactionCache;
use meals_bulk_import::logging;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::*;

fn api_over(conn: Connection) -> ImportApi {
    ImportApi::new(
        Arc::new(Mutex::new(conn)),
        Arc::new(TtlTransactionCache::default()),
        ImportConfig::default(),
    )
}

fn full_dataset() -> Vec<(FileType, String)> {
    vec![
        (
            FileType::ProductLines,
            csv(PRODUCT_LINES_HEADER, &["Soups", "Sauces"]),
        ),
        (
            FileType::Ingredients,
            csv(
                INGREDIENTS_HEADER,
                &[
                    ",Salt,Acme,1 kg,1.5,fine",
                    ",Tomato,Farm Co,10 lb.,12,",
                    ",Olive Oil,Grove,2.5 L,18.75,\"cold, pressed\"",
                ],
            ),
        ),
        (
            FileType::Formulas,
            csv(
                FORMULAS_HEADER,
                &[
                    ",Tomato Base,1,0.25 kg,house",
                    ",Tomato Base,2,4 lb.,house",
                    ",Dressing,3,500 mL,",
                ],
            ),
        ),
        (
            FileType::Skus,
            csv(
                SKUS_HEADER,
                &[
                    &format!(
                        ",Tomato Soup,{},{},12 oz,24,Soups,1,1.5,\"L1, L2\",40,",
                        UPC_A, UPC_B
                    ),
                    &format!(",Vinaigrette,{},{},8 oz,12,Sauces,2,,L2,,", UPC_C, UPC_D),
                ],
            ),
        ),
    ]
}

fn as_uploads(files: &[(FileType, String)]) -> std::collections::HashMap<FileType, meals_bulk_import::UploadedFile> {
    let refs: Vec<(FileType, &str)> = files.iter().map(|(t, c)| (*t, c.as_str())).collect();
    uploads(&refs)
}

fn seeded_api() -> (tempfile::NamedTempFile, ImportApi) {
    let (file, conn) = create_test_db().unwrap();
    seed_manufacturing_line(&conn, "L1");
    seed_manufacturing_line(&conn, "L2");
    (file, api_over(conn))
}

#[test]
fn test_export_then_reimport_is_idempotent() {
    logging::init_test();
    let (_file, api) = seeded_api();

    let response = api
        .process_files(&as_uploads(&full_dataset()), "s1")
        .unwrap();
    assert_eq!(response.inserted.get("Product Line"), Some(&2));
    assert_eq!(response.inserted.get("Ingredient"), Some(&3));
    assert_eq!(response.inserted.get("Formula"), Some(&2));
    assert_eq!(response.inserted.get("SKU"), Some(&2));

    let exported: Vec<(FileType, String)> = FileType::TOPOLOGICAL_ORDER
        .into_iter()
        .map(|ft| (ft, api.export(ft).unwrap()))
        .collect();

    // 配方按原料关联逐行展开
    let formula_rows = exported[2].1.lines().count();
    assert_eq!(formula_rows, 1 + 3);

    let again = api.process_files(&as_uploads(&exported), "s1").unwrap();
    for entity in ["Product Line", "Ingredient", "Formula", "SKU"] {
        assert_eq!(again.inserted.get(entity), Some(&0), "{} inserted", entity);
    }
    assert_eq!(again.ignored.get("Product Line"), Some(&2));
    assert_eq!(again.ignored.get("Ingredient"), Some(&3));
    assert_eq!(again.ignored.get("Formula"), Some(&2));
    assert_eq!(again.ignored.get("SKU"), Some(&2));
    assert!(!api.has_ongoing_transaction("s1"));

    // 再次导出内容不变
    for (file_type, content) in &exported {
        assert_eq!(&api.export(*file_type).unwrap(), content);
    }
}

#[test]
fn test_export_formats() {
    let (_file, api) = seeded_api();
    api.process_files(&as_uploads(&full_dataset()), "s1")
        .unwrap();

    let ingredients = api.export(FileType::Ingredients).unwrap();
    let mut lines = ingredients.lines();
    assert_eq!(lines.next(), Some(INGREDIENTS_HEADER));
    assert_eq!(lines.next(), Some("1,Salt,Acme,1 kg,1.5,fine"));
    assert_eq!(lines.next(), Some("2,Tomato,Farm Co,10 lb.,12,"));
    assert_eq!(lines.next(), Some("3,Olive Oil,Grove,2.5 L,18.75,\"cold, pressed\""));

    let skus = api.export(FileType::Skus).unwrap();
    assert!(skus.contains("\"L1, L2\""));
}

#[test]
fn test_collision_flow_through_api() {
    let (_file, api) = seeded_api();
    api.process_files(&as_uploads(&full_dataset()), "setup")
        .unwrap();

    let changed = csv(INGREDIENTS_HEADER, &[",Salt,Acme,1 kg,2,fine"]);
    let err = api
        .process_files(&upload(FileType::Ingredients, &changed), "s1")
        .unwrap_err();
    assert!(err.is_collision());
    match &err {
        ApiError::CollisionPending {
            filename,
            collisions,
            ..
        } => {
            assert_eq!(filename, "ingredients.csv");
            assert_eq!(*collisions, 1);
        }
        other => panic!("Expected CollisionPending, got {:?}", other),
    }

    let pending = api.get_transaction("s1").unwrap();
    assert_eq!(pending.session_key, "s1");
    assert_eq!(pending.files[0].file_type, FileType::Ingredients);

    let response = api.force_save("s1", true).unwrap();
    assert!(response.committed);
    assert_eq!(response.summary.updated.get("Ingredient"), Some(&1));
    assert!(!api.has_ongoing_transaction("s1"));

    let exported = api.export(FileType::Ingredients).unwrap();
    assert!(exported.contains("1,Salt,Acme,1 kg,2,fine"));

    let err = api.get_transaction("s1").unwrap_err();
    assert!(matches!(err, ApiError::NoOngoingTransaction(_)));
    let err = api.force_save("s1", true).unwrap_err();
    assert!(matches!(err, ApiError::NoOngoingTransaction(_)));
}

#[test]
fn test_source_errors_map_to_api_errors() {
    let (_file, api) = seeded_api();

    let duplicate = csv(INGREDIENTS_HEADER, &[",Salt,Acme,1 kg,1,", ",Salt,Acme,1 kg,1,"]);
    let err = api
        .process_files(&upload(FileType::Ingredients, &duplicate), "s1")
        .unwrap_err();
    assert!(matches!(err, ApiError::DuplicateRecord(ref msg) if msg.contains("第 2 行")));

    let orphan = csv(
        SKUS_HEADER,
        &[&format!(",Soup,{},{},12 oz,24,Soups,1,,,,", UPC_A, UPC_B)],
    );
    let err = api
        .process_files(&upload(FileType::Skus, &orphan), "s1")
        .unwrap_err();
    assert!(matches!(err, ApiError::IntegrityViolation(_)));

    let err = api.process_files(&upload(FileType::Skus, &orphan), " ").unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_process_paths_detects_file_types() {
    let (_file, api) = seeded_api();
    let dir = tempfile::tempdir().unwrap();

    let pl_path = dir.path().join("product_lines.csv");
    std::fs::write(&pl_path, csv(PRODUCT_LINES_HEADER, &["Soups"])).unwrap();
    let ingr_path = dir.path().join("ingredients_2024.csv");
    std::fs::write(&ingr_path, csv(INGREDIENTS_HEADER, &[",Salt,Acme,1 kg,1,"])).unwrap();
    let notes_path = dir.path().join("notes.txt");
    std::fs::write(&notes_path, "ignored").unwrap();

    let response = api
        .process_paths(&[&pl_path, &ingr_path, &notes_path], "s1")
        .unwrap();
    assert_eq!(response.inserted.get("Product Line"), Some(&1));
    assert_eq!(response.inserted.get("Ingredient"), Some(&1));

    let other_ingr = dir.path().join("ingredients.csv");
    std::fs::write(&other_ingr, csv(INGREDIENTS_HEADER, &[",Pepper,Acme,1 kg,1,"])).unwrap();
    let err = api
        .process_paths(&[&ingr_path, &other_ingr], "s1")
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = api.process_paths(&[&notes_path], "s1").unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_skus_keep_manufacturing_lines_when_identical() {
    let (file, api) = seeded_api();
    let dataset = full_dataset();
    api.process_files(&as_uploads(&dataset), "s1").unwrap();
    api.process_files(&as_uploads(&dataset[3..]), "s1").unwrap();

    let conn = Connection::open(file.path()).unwrap();
    assert_eq!(count::<Sku>(&conn), 2);
    assert_eq!(count::<meals_bulk_import::SkuManufacturingLine>(&conn), 3);
    assert_eq!(count::<Ingredient>(&conn), 3);
}
