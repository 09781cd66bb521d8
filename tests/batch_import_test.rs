// ==========================================
// 批次导入集成测试
// ==========================================
// 测试目标: 重复导入、文件内重复、引用完整性、冲突暂存与强制提交、
//           关联整组替换、歧义匹配
// ==========================================


use meals_bulk_import::domain::{
    FieldValue, FileType, Formula, FormulaIngredient, Ingredient, ProductLine, Sku,
    SkuManufacturingLine,
};
use meals_bulk_import::importer::ImportError;
use meals_bulk_import::logging;
use meals_bulk_import::repository::EntityRepository;
use test_helpers::*;

fn ingredients(rows: &[&str]) -> String {
    csv(INGREDIENTS_HEADER, rows)
}

fn formulas(rows: &[&str]) -> String {
    csv(FORMULAS_HEADER, rows)
}

fn counted(map: &std::collections::BTreeMap<String, usize>, entity: &str) -> usize {
    map.get(entity).copied().unwrap_or(0)
}

/// 预置原料 Salt(#1) / Pepper(#2) / Sugar(#3)，均以 kg 计
fn seed_ingredients(conn: &rusqlite::Connection) {
    let batch = batch_importer();
    let content = ingredients(&[
        "1,Salt,Acme,1 kg,1.5,",
        "2,Pepper,Acme,2 kg,3,",
        "3,Sugar,Acme,5 kg,4,",
    ]);
    batch
        .process(conn, &upload(FileType::Ingredients, &content), "seed")
        .unwrap();
}

// ==========================================
// 重复导入
// ==========================================

#[test]
fn test_reimport_reports_ignored() {
    logging::init_test();
    let (_file, conn) = create_test_db().unwrap();
    let batch = batch_importer();

    let files = uploads(&[
        (FileType::ProductLines, &csv(PRODUCT_LINES_HEADER, &["Soups"])),
        (FileType::Ingredients, &ingredients(&[",Salt,Acme,1 kg,1.5,fine"])),
    ]);

    let first = batch.process(&conn, &files, "s1").unwrap();
    assert_eq!(counted(&first.inserted, "Product Line"), 1);
    assert_eq!(counted(&first.inserted, "Ingredient"), 1);

    let second = batch.process(&conn, &files, "s1").unwrap();
    assert_eq!(counted(&second.inserted, "Product Line"), 0);
    assert_eq!(counted(&second.inserted, "Ingredient"), 0);
    assert_eq!(counted(&second.ignored, "Product Line"), 1);
    assert_eq!(counted(&second.ignored, "Ingredient"), 1);

    assert_eq!(count::<ProductLine>(&conn), 1);
    assert_eq!(count::<Ingredient>(&conn), 1);
}

#[test]
fn test_blank_files_are_skipped() {
    let (_file, conn) = create_test_db().unwrap();
    let batch = batch_importer();

    let files = uploads(&[
        (FileType::ProductLines, "  \n"),
        (FileType::Ingredients, &ingredients(&[",Salt,Acme,1 kg,1.5,"])),
    ]);
    let summary = batch.process(&conn, &files, "s1").unwrap();
    assert!(!summary.inserted.contains_key("Product Line"));
    assert_eq!(counted(&summary.inserted, "Ingredient"), 1);
}

// ==========================================
// 文件内重复 / 引用完整性
// ==========================================

#[test]
fn test_in_file_duplicate_names_both_lines() {
    let (_file, conn) = create_test_db().unwrap();
    let batch = batch_importer();

    let content = ingredients(&[
        ",Salt,Acme,1 kg,1.5,",
        ",Pepper,Acme,1 kg,2,",
        ",Salt,Other,2 kg,1.5,",
    ]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();

    match err {
        ImportError::Duplicate {
            first_line,
            line_num,
            fields,
            values,
            ..
        } => {
            assert_eq!(first_line, 2);
            assert_eq!(line_num, 4);
            assert_eq!(fields, "Name");
            assert_eq!(values, "Salt");
        }
        other => panic!("Expected Duplicate, got {:?}", other),
    }
    assert_eq!(count::<Ingredient>(&conn), 0);
    assert!(!batch.has_ongoing_transaction("s1"));
}

#[test]
fn test_explicit_key_matching_auto_assigned_key_is_duplicate() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    // Basil 自动分配 Ingr# 4，Thyme 随后显式使用 4
    let content = ingredients(&[",Basil,Herbs,1 kg,6,", "4,Thyme,Herbs,1 kg,7,"]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();

    match err {
        ImportError::Duplicate {
            first_line,
            line_num,
            fields,
            values,
            ..
        } => {
            assert_eq!(first_line, 2);
            assert_eq!(line_num, 3);
            assert_eq!(fields, "Ingr#");
            assert_eq!(values, "4");
        }
        other => panic!("Expected Duplicate, got {:?}", other),
    }
    assert_eq!(count::<Ingredient>(&conn), 3);
    assert!(find_by::<Ingredient>(&conn, "name", FieldValue::text("Basil")).is_none());
    assert!(!batch.has_ongoing_transaction("s1"));
}

#[test]
fn test_missing_foreign_key_is_integrity_error() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let content = formulas(&["1,Brine,1,0.5 kg,", "2,Rub,99,1 kg,"]);
    let err = batch
        .process(&conn, &upload(FileType::Formulas, &content), "s1")
        .unwrap_err();

    match err {
        ImportError::Integrity {
            filename,
            line_num,
            referred,
            value,
            ..
        } => {
            assert_eq!(filename, "formulas.csv");
            assert_eq!(line_num, 3);
            assert_eq!(referred, "Ingredient");
            assert_eq!(value, "99");
        }
        other => panic!("Expected Integrity, got {:?}", other),
    }

    // 第一行的配方随整批回滚
    assert_eq!(count::<Formula>(&conn), 0);
    assert_eq!(count::<FormulaIngredient>(&conn), 0);
    assert!(!batch.has_ongoing_transaction("s1"));
}

#[test]
fn test_incompatible_quantity_unit_is_rejected() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let content = formulas(&["1,Brine,1,2 gal,"]);
    let err = batch
        .process(&conn, &upload(FileType::Formulas, &content), "s1")
        .unwrap_err();
    assert!(matches!(err, ImportError::Validation { ref column, .. } if column == "Quantity"));
    assert_eq!(count::<Formula>(&conn), 0);
}

// ==========================================
// 冲突暂存与强制提交
// ==========================================

#[test]
fn test_collision_force_save_overwrites_existing() {
    logging::init_test();
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    // Ingr# 留空 + 名称命中 Salt(#1) + 成本不同
    let content = ingredients(&[",Salt,Acme,1 kg,2.25,coarse", ",Basil,Herbs,1 kg,6,"]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();
    match &err {
        ImportError::CollisionOccurred {
            filename,
            collisions,
            skipped_files,
        } => {
            assert_eq!(filename, "ingredients.csv");
            assert_eq!(*collisions, 1);
            assert!(skipped_files.is_empty());
        }
        other => panic!("Expected CollisionOccurred, got {:?}", other),
    }

    // 已回滚: Basil 尚未落库，Salt 未修改
    assert_eq!(count::<Ingredient>(&conn), 3);
    let salt: Ingredient = find_by(&conn, "name", FieldValue::text("Salt")).unwrap();
    assert_eq!(salt.cost, 1.5);

    // 冲突明细
    assert!(batch.has_ongoing_transaction("s1"));
    let pending = batch.get_transaction("s1").unwrap();
    assert_eq!(pending.total_collisions(), 1);
    let collision = &pending.files[0].collisions[0];
    assert_eq!(collision.line_num, 2);
    assert_eq!(collision.existing, "Ingredient #1");
    let fields: Vec<&str> = collision
        .differences
        .iter()
        .map(|d| d.field.as_str())
        .collect();
    assert_eq!(fields, vec!["Cost", "Comment"]);

    // 强制提交
    let summary = batch.force_save(&conn, "s1", true).unwrap();
    assert_eq!(summary.updated.get("Ingredient"), Some(&1));
    assert_eq!(summary.inserted.get("Ingredient"), Some(&1));
    assert!(!batch.has_ongoing_transaction("s1"));

    let salt: Ingredient = find_by(&conn, "name", FieldValue::text("Salt")).unwrap();
    assert_eq!(salt.number, Some(1));
    assert_eq!(salt.cost, 2.25);
    assert_eq!(salt.comment, "coarse");
    assert_eq!(count::<Ingredient>(&conn), 4);
}

#[test]
fn test_force_save_false_discards() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let content = ingredients(&[",Salt,Acme,1 kg,9,"]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();
    assert!(err.is_collision());

    let summary = batch.force_save(&conn, "s1", false).unwrap();
    assert_eq!(summary.total_updated(), 0);
    assert!(!batch.has_ongoing_transaction("s1"));

    let salt: Ingredient = find_by(&conn, "name", FieldValue::text("Salt")).unwrap();
    assert_eq!(salt.cost, 1.5);

    let err = batch.force_save(&conn, "s1", true).unwrap_err();
    assert!(matches!(err, ImportError::NoOngoingTransaction(_)));
}

#[test]
fn test_collision_rolls_back_batch_and_names_skipped_files() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let files = uploads(&[
        (FileType::ProductLines, &csv(PRODUCT_LINES_HEADER, &["Soups"])),
        (FileType::Ingredients, &ingredients(&[",Salt,Acme,1 kg,9,"])),
        (FileType::Formulas, &formulas(&["1,Brine,1,0.5 kg,"])),
    ]);
    let err = batch.process(&conn, &files, "s1").unwrap_err();
    match &err {
        ImportError::CollisionOccurred {
            filename,
            skipped_files,
            ..
        } => {
            assert_eq!(filename, "ingredients.csv");
            assert_eq!(skipped_files, &vec!["formulas.csv".to_string()]);
        }
        other => panic!("Expected CollisionOccurred, got {:?}", other),
    }
    assert_eq!(count::<ProductLine>(&conn), 0);

    // 暂存批次包含已处理的两个文件，按拓扑顺序
    let pending = batch.get_transaction("s1").unwrap();
    let names: Vec<&str> = pending.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["product_lines.csv", "ingredients.csv"]);

    let summary = batch.force_save(&conn, "s1", true).unwrap();
    assert_eq!(summary.inserted.get("Product Line"), Some(&1));
    assert_eq!(summary.updated.get("Ingredient"), Some(&1));
    assert_eq!(count::<ProductLine>(&conn), 1);
    assert_eq!(count::<Formula>(&conn), 0);
}

#[test]
fn test_fresh_process_supersedes_pending_batch() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let colliding = ingredients(&[",Salt,Acme,1 kg,9,"]);
    assert!(batch
        .process(&conn, &upload(FileType::Ingredients, &colliding), "s1")
        .unwrap_err()
        .is_collision());
    assert!(batch.has_ongoing_transaction("s1"));

    let clean = ingredients(&[",Basil,Herbs,1 kg,6,"]);
    batch
        .process(&conn, &upload(FileType::Ingredients, &clean), "s1")
        .unwrap();
    assert!(!batch.has_ongoing_transaction("s1"));
}

#[test]
fn test_sessions_are_independent() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let colliding = ingredients(&[",Salt,Acme,1 kg,9,"]);
    for key in ["a", "b"] {
        assert!(batch
            .process(&conn, &upload(FileType::Ingredients, &colliding), key)
            .unwrap_err()
            .is_collision());
    }
    assert!(batch.clear_transaction("a"));
    assert!(!batch.has_ongoing_transaction("a"));
    assert!(batch.has_ongoing_transaction("b"));
}

// ==========================================
// 歧义匹配
// ==========================================

// 显式主键未命中但名称命中现有记录: 按歧义拒绝，不采用名称匹配的记录。
// 主键留空时才采用名称匹配（见 test_collision_force_save_overwrites_existing），
// 取舍记录在 DESIGN.md「Explicit key with a secondary match」。
#[test]
fn test_unknown_explicit_key_with_matching_name_is_ambiguous() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    for key in ["42", "0"] {
        let content = ingredients(&[&format!("{},Salt,Acme,1 kg,1.5,", key)]);
        let err = batch
            .process(&conn, &upload(FileType::Ingredients, &content), "s1")
            .unwrap_err();
        match err {
            ImportError::AmbiguousRecord { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates[0].contains("Ingredient #1"));
            }
            other => panic!("Expected AmbiguousRecord, got {:?}", other),
        }
    }
    assert!(!batch.has_ongoing_transaction("s1"));
}

#[test]
fn test_ambiguous_record_names_both_candidates() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    // Ingr# 1 指向 Salt，名称 Pepper 指向 #2
    let content = ingredients(&["1,Pepper,Acme,2 kg,3,"]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();
    match err {
        ImportError::AmbiguousRecord {
            line_num,
            model,
            candidates,
            ..
        } => {
            assert_eq!(line_num, 2);
            assert_eq!(model, "Ingredient");
            let joined = candidates.join("; ");
            assert!(joined.contains("Ingredient #1"));
            assert!(joined.contains("Ingredient #2"));
        }
        other => panic!("Expected AmbiguousRecord, got {:?}", other),
    }
}

#[test]
fn test_two_rows_claiming_same_record_are_ambiguous() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    // 第 2 行按 Ingr# 命中 Salt，第 3 行按名称再次命中 Salt
    let content = ingredients(&["1,Rock Salt,Acme,1 kg,1.5,", ",Salt,Acme,1 kg,9,"]);
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, &content), "s1")
        .unwrap_err();
    match err {
        ImportError::AmbiguousRecord {
            line_num,
            model,
            candidates,
            ..
        } => {
            assert_eq!(line_num, 3);
            assert_eq!(model, "Ingredient");
            assert_eq!(candidates.len(), 2);
            assert!(candidates[0].contains("第 2 行"));
            assert!(candidates[1].contains("第 3 行"));
            assert!(candidates.iter().all(|c| c.contains("Ingredient #1")));
        }
        other => panic!("Expected AmbiguousRecord, got {:?}", other),
    }
    assert!(!batch.has_ongoing_transaction("s1"));

    let salt = find_by::<Ingredient>(&conn, "number", FieldValue::Integer(1)).unwrap();
    assert_eq!(salt.name, "Salt");
    assert_eq!(salt.cost, 1.5);
}

// ==========================================
// 关联整组替换
// ==========================================

fn links_of(conn: &rusqlite::Connection, formula: i64) -> Vec<(i64, f64)> {
    let mut links: Vec<(i64, f64)> = EntityRepository::new(conn)
        .find_by_fields::<FormulaIngredient>(&[("formula", FieldValue::Integer(formula))])
        .unwrap()
        .into_iter()
        .map(|l| (l.ingredient, l.quantity))
        .collect();
    links.sort_by_key(|(ingredient, _)| *ingredient);
    links
}

#[test]
fn test_formula_links_are_replaced_not_merged() {
    logging::init_test();
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let first = formulas(&[
        ",Brine,1,1 kg,",
        ",Brine,2,2 kg,",
        ",Rub,1,5 kg,",
    ]);
    let summary = batch
        .process(&conn, &upload(FileType::Formulas, &first), "s1")
        .unwrap();
    assert_eq!(counted(&summary.inserted, "Formula"), 2);

    let brine: Formula = find_by(&conn, "name", FieldValue::text("Brine")).unwrap();
    let rub: Formula = find_by(&conn, "name", FieldValue::text("Rub")).unwrap();
    let (brine_no, rub_no) = (brine.number.unwrap(), rub.number.unwrap());
    assert_eq!(links_of(&conn, brine_no), vec![(1, 1.0), (2, 2.0)]);

    let second = formulas(&[&format!("{},Brine,3,3 kg,", brine_no)]);
    let summary = batch
        .process(&conn, &upload(FileType::Formulas, &second), "s1")
        .unwrap();
    assert_eq!(counted(&summary.ignored, "Formula"), 1);

    assert_eq!(links_of(&conn, brine_no), vec![(3, 3.0)]);
    assert_eq!(links_of(&conn, rub_no), vec![(1, 5.0)]);
}

#[test]
fn test_formula_number_mismatch_for_same_name_is_rejected() {
    let (_file, conn) = create_test_db().unwrap();
    seed_ingredients(&conn);
    let batch = batch_importer();

    let content = formulas(&["7,Brine,1,1 kg,", "8,Brine,2,1 kg,"]);
    let err = batch
        .process(&conn, &upload(FileType::Formulas, &content), "s1")
        .unwrap_err();
    assert!(matches!(err, ImportError::Validation { line_num: 3, .. }));
}

// ==========================================
// SKU
// ==========================================

fn seed_sku_parents(conn: &rusqlite::Connection) {
    seed_ingredients(conn);
    seed_product_line(conn, "Soups");
    seed_manufacturing_line(conn, "L1");
    seed_manufacturing_line(conn, "L2");
    batch_importer()
        .process(
            conn,
            &upload(FileType::Formulas, &formulas(&["1,Brine,1,1 kg,"])),
            "seed",
        )
        .unwrap();
}

#[test]
fn test_sku_import_links_manufacturing_lines() {
    let (_file, conn) = create_test_db().unwrap();
    seed_sku_parents(&conn);
    let batch = batch_importer();

    let row = format!(
        ",Tomato Soup,{},{},12 oz,24,Soups,1,,\"L1, L2\",,",
        UPC_A, UPC_B
    );
    let summary = batch
        .process(&conn, &upload(FileType::Skus, &csv(SKUS_HEADER, &[&row])), "s1")
        .unwrap();
    assert_eq!(counted(&summary.inserted, "SKU"), 1);

    let sku: Sku = find_by(&conn, "case_upc", FieldValue::text(UPC_A)).unwrap();
    assert_eq!(sku.formula_scale, 1.0);
    assert_eq!(sku.manufacturing_rate, 1.0);
    assert_eq!(count::<SkuManufacturingLine>(&conn), 2);
}

#[test]
fn test_sku_rejects_invalid_upc_and_missing_lines() {
    let (_file, conn) = create_test_db().unwrap();
    seed_sku_parents(&conn);
    let batch = batch_importer();

    let bad_upc = format!(",Soup,036000291453,{},12 oz,24,Soups,1,,L1,,", UPC_B);
    let err = batch
        .process(&conn, &upload(FileType::Skus, &csv(SKUS_HEADER, &[&bad_upc])), "s1")
        .unwrap_err();
    assert!(matches!(err, ImportError::Validation { ref column, .. } if column == "Case UPC"));

    let missing_line = format!(",Soup,{},{},12 oz,24,Soups,1,,L9,,", UPC_C, UPC_D);
    let err = batch
        .process(
            &conn,
            &upload(FileType::Skus, &csv(SKUS_HEADER, &[&missing_line])),
            "s1",
        )
        .unwrap_err();
    assert!(matches!(err, ImportError::Integrity { ref value, .. } if value == "L9"));

    let missing_pl = format!(",Soup,{},{},12 oz,24,Salads,1,,L1,,", UPC_C, UPC_D);
    let err = batch
        .process(
            &conn,
            &upload(FileType::Skus, &csv(SKUS_HEADER, &[&missing_pl])),
            "s1",
        )
        .unwrap_err();
    assert!(matches!(err, ImportError::Integrity { ref referred, .. } if referred == "Product Line"));
    assert_eq!(count::<Sku>(&conn), 0);
}

#[test]
fn test_header_mismatch_is_reported() {
    let (_file, conn) = create_test_db().unwrap();
    let batch = batch_importer();

    let content = "Name,Ingr#,Vendor Info,Size,Cost,Comment\nSalt,,Acme,1 kg,1,\n";
    let err = batch
        .process(&conn, &upload(FileType::Ingredients, content), "s1")
        .unwrap_err();
    assert!(matches!(err, ImportError::HeaderMismatch { .. }));
}
