// ==========================================
// 配方主数据批量导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + CSV
// 范围: 产品线 / 原料 / 配方 / SKU 的批量导入、冲突对账与强制提交
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体描述符与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解析、对账、暂存
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 启动装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    Entity, FileType, Formula, FormulaIngredient, Ingredient, ManufacturingLine, ProductLine,
    Sku, SkuManufacturingLine,
};

// 导入
pub use importer::{
    BatchImporter, ImportError, ImportResult, TransactionCache, TtlTransactionCache, UploadedFile,
};

// API
pub use api::{ApiError, ApiResult, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "配方主数据批量导入";
