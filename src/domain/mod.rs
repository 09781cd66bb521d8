// ==========================================
// 配方主数据批量导入 - 领域模型层
// ==========================================
// 职责: 定义实体描述符、字段值、单位与 UPC 规则
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod entity;
pub mod formula;
pub mod ingredient;
pub mod manufacturing_line;
pub mod product_line;
pub mod sku;
pub mod types;
pub mod unit;
pub mod upc;

// 重导出核心类型
pub use entity::Entity;
pub use formula::{Formula, FormulaIngredient};
pub use ingredient::Ingredient;
pub use manufacturing_line::{ManufacturingLine, SkuManufacturingLine};
pub use product_line::ProductLine;
pub use sku::Sku;
pub use types::{FieldDecodeError, FieldDef, FieldValue, FileType};
pub use unit::{find_unit, parse_quantity, Unit, UnitParseError, UnitType};
pub use upc::{is_valid_upc, upc_check_digit};
