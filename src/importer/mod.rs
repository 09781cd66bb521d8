// ==========================================
// 配方主数据批量导入 - 导入层
// ==========================================
// 职责: CSV 解析、逐行校验、文件内重复检测、与库内记录对账、
//       冲突暂存与强制提交、CSV 导出
// 顺序: 产品线 → 原料 → 配方 → SKU
// ==========================================

// 模块声明
pub mod batch;
pub mod collision_resolver;
pub mod duplicate_detector;
pub mod entity_importer;
pub mod error;
pub mod exporter;
pub mod field_mapper;
pub mod file_parser;
pub mod formula_importer;
pub mod importer_trait;
pub mod ingredient_importer;
pub mod pending_cache;
pub mod product_line_importer;
pub mod registry;
pub mod sku_importer;

// 重导出核心类型
pub use batch::{BatchImporter, BatchSummary, ForceSaveSummary, UploadedFile};
pub use collision_resolver::{CollisionResolver, Resolution};
pub use duplicate_detector::{DuplicateDetector, DuplicateHit};
pub use entity_importer::EntityImporter;
pub use error::{ImportError, ImportResult};
pub use exporter::export;
pub use field_mapper::RowReader;
pub use file_parser::{CsvParser, RawRow};
pub use formula_importer::FormulaConverter;
pub use importer_trait::{
    CollisionRecord, FieldDifference, ImportCounts, ImportOutcome, Importer, RowConverter,
};
pub use ingredient_importer::IngredientConverter;
pub use pending_cache::{
    PendingBatch, PendingBatchSummary, PendingFileSummary, TransactionCache, TtlTransactionCache,
};
pub use product_line_importer::ProductLineConverter;
pub use registry::{create_importer, registration, EntityRegistration};
pub use sku_importer::SkuConverter;
