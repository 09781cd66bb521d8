// ==========================================
// 配方主数据批量导入 - 命令行入口
// ==========================================
// 用法: meals-import [--db <path>] <file.csv>...
// 流程:
// 1. 按文件名识别类型并整批导入
// 2. 发生冲突时列出冲突明细，询问是否覆盖现有记录
// 3. 结果以 JSON 输出到 stdout，日志输出到 stderr
// ==========================================

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use meals_bulk_import::app::{get_default_db_path, AppState};
use meals_bulk_import::importer::PendingBatchSummary;
use meals_bulk_import::{logging, ApiError, APP_NAME, VERSION};

struct CliArgs {
    db_path: String,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut db_path = None;
    let mut files = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                db_path = Some(args.next().ok_or("--db 需要数据库路径")?);
            }
            "-h" | "--help" => {
                return Err("用法: meals-import [--db <path>] <file.csv>...".to_string());
            }
            _ => files.push(PathBuf::from(arg)),
        }
    }
    if files.is_empty() {
        return Err("至少需要一个 CSV 文件".to_string());
    }
    Ok(CliArgs {
        db_path: db_path.unwrap_or_else(get_default_db_path),
        files,
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("结果序列化失败: {}", e),
    }
}

fn print_collisions(pending: &PendingBatchSummary) {
    eprintln!("检测到 {} 条冲突记录:", pending.total_collisions());
    for file in &pending.files {
        for collision in &file.collisions {
            eprintln!(
                "  {}:{} {} 现有: {} / 新值: {}",
                collision.filename,
                collision.line_num,
                collision.model,
                collision.existing,
                collision.proposed
            );
            for diff in &collision.differences {
                eprintln!("      {}: '{}' -> '{}'", diff.field, diff.existing, diff.proposed);
            }
        }
    }
}

fn confirm(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn main() -> ExitCode {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };

    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("使用数据库: {}", args.db_path);

    let state = match AppState::new(args.db_path) {
        Ok(state) => state,
        Err(msg) => {
            tracing::error!("无法初始化AppState: {}", msg);
            return ExitCode::FAILURE;
        }
    };
    let api = &state.import_api;
    let session_key = uuid::Uuid::new_v4().to_string();

    match api.process_paths(&args.files, &session_key) {
        Ok(response) => {
            print_json(&response);
            ExitCode::SUCCESS
        }
        Err(err @ ApiError::CollisionPending { .. }) => {
            eprintln!("{}", err);
            match api.get_transaction(&session_key) {
                Ok(pending) => print_collisions(&pending),
                Err(e) => tracing::warn!("无法读取冲突明细: {}", e),
            }

            let force = confirm("是否用导入数据覆盖现有记录?");
            match api.force_save(&session_key, force) {
                Ok(response) => {
                    print_json(&response);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
