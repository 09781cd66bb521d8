// ==========================================
// 配方主数据批量导入 - 实体注册表
// ==========================================
// 职责: 文件类型 → 表头、模型名（静态查表，无状态）、导入器工厂
// ==========================================

use crate::config::ImportConfig;
use crate::domain::types::FileType;
use crate::importer::entity_importer::EntityImporter;
use crate::importer::formula_importer::FormulaConverter;
use crate::importer::importer_trait::Importer;
use crate::importer::ingredient_importer::IngredientConverter;
use crate::importer::product_line_importer::ProductLineConverter;
use crate::importer::sku_importer::SkuConverter;

/// 单个文件类型的注册信息
#[derive(Debug, Clone, Copy)]
pub struct EntityRegistration {
    pub file_type: FileType,
    pub model_name: &'static str,
    /// 按位置校验的表头
    pub header: &'static [&'static str],
}

impl EntityRegistration {
    /// 列名对应的位置
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| *h == column)
    }
}

static PRODUCT_LINES: EntityRegistration = EntityRegistration {
    file_type: FileType::ProductLines,
    model_name: "Product Line",
    header: &["Name"],
};

static INGREDIENTS: EntityRegistration = EntityRegistration {
    file_type: FileType::Ingredients,
    model_name: "Ingredient",
    header: &["Ingr#", "Name", "Vendor Info", "Size", "Cost", "Comment"],
};

static FORMULAS: EntityRegistration = EntityRegistration {
    file_type: FileType::Formulas,
    model_name: "Formula",
    header: &["Formula#", "Name", "Ingr#", "Quantity", "Comment"],
};

static SKUS: EntityRegistration = EntityRegistration {
    file_type: FileType::Skus,
    model_name: "SKU",
    header: &[
        "SKU#",
        "Name",
        "Case UPC",
        "Unit UPC",
        "Unit size",
        "Count per case",
        "PL Name",
        "Formula#",
        "Formula factor",
        "ML Shortnames",
        "Rate",
        "Comment",
    ],
};

/// 查询注册信息
pub fn registration(file_type: FileType) -> &'static EntityRegistration {
    match file_type {
        FileType::ProductLines => &PRODUCT_LINES,
        FileType::Ingredients => &INGREDIENTS,
        FileType::Formulas => &FORMULAS,
        FileType::Skus => &SKUS,
    }
}

/// 为指定文件类型创建未绑定的导入器
pub fn create_importer(
    file_type: FileType,
    filename: &str,
    config: &ImportConfig,
) -> Box<dyn Importer> {
    match file_type {
        FileType::ProductLines => Box::new(EntityImporter::new(filename, ProductLineConverter)),
        FileType::Ingredients => Box::new(EntityImporter::new(filename, IngredientConverter)),
        FileType::Formulas => Box::new(EntityImporter::new(filename, FormulaConverter::default())),
        FileType::Skus => Box::new(EntityImporter::new(
            filename,
            SkuConverter::new(config.formula_default_scale),
        )),
    }
}
