// ==========================================
// 配方主数据批量导入 - CSV 文件解析器
// ==========================================
// 职责: 字节流 → 原始行（物理行号 + 去空白单元格）
// 规则: UTF-8（去 BOM）、表头按位置精确校验、跳过空白行
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::registry::EntityRegistration;
use csv::{ReaderBuilder, Trim};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 一行原始数据
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 物理行号（表头为第 1 行）
    pub line_num: usize,
    /// 与表头等长的单元格（缺失列补空串）
    pub cells: Vec<String>,
}

// ==========================================
// CSV Parser
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 解析上传内容
    ///
    /// # 参数
    /// - registration: 目标文件类型的注册信息（提供表头）
    /// - filename: 原始文件名（仅用于错误信息）
    /// - content: 原始字节
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 数据行（不含表头与空白行）
    /// - Err: 编码错误 / 表头不匹配 / CSV 结构错误
    pub fn parse(
        &self,
        registration: &EntityRegistration,
        filename: &str,
        content: &[u8],
    ) -> ImportResult<Vec<RawRow>> {
        let bytes = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let text = std::str::from_utf8(bytes).map_err(|e| ImportError::Encoding {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 行长度校验由下方统一处理
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let csv_error = |e: csv::Error| ImportError::Csv {
            filename: filename.to_string(),
            message: e.to_string(),
        };

        let mut records = reader.records();

        // 读取并校验表头
        let header: Vec<String> = match records.next() {
            Some(result) => result.map_err(csv_error)?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        };
        if header.iter().map(String::as_str).ne(registration.header.iter().copied()) {
            return Err(ImportError::HeaderMismatch {
                filename: filename.to_string(),
                expected: registration.header.join(","),
                actual: header.join(","),
            });
        }

        let width = registration.header.len();
        let mut rows = Vec::new();
        for result in records {
            let record = result.map_err(csv_error)?;
            let line_num = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(rows.len() + 2);

            // 跳过完全空白的行
            if record.iter().all(str::is_empty) {
                continue;
            }

            if record.len() > width {
                return Err(ImportError::Csv {
                    filename: filename.to_string(),
                    message: format!(
                        "第 {} 行有 {} 列，超过表头的 {} 列",
                        line_num,
                        record.len(),
                        width
                    ),
                });
            }

            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(width, String::new());
            rows.push(RawRow { line_num, cells });
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FileType;
    use crate::importer::registry::registration;

    fn parse(file_type: FileType, content: &str) -> ImportResult<Vec<RawRow>> {
        CsvParser.parse(registration(file_type), "test.csv", content.as_bytes())
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let rows = parse(
            FileType::Ingredients,
            "Ingr#,Name,Vendor Info,Size,Cost,Comment\n1, Salt ,Acme,10 lb,2.50,\n\n2,Pepper,,1 oz,1.25,hot\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line_num, 2);
        assert_eq!(rows[0].cells[1], "Salt");
        // 空白行仍占用物理行号
        assert_eq!(rows[1].line_num, 4);
        assert_eq!(rows[1].cells[5], "hot");
    }

    #[test]
    fn test_csv_parser_strips_bom_and_pads_short_rows() {
        let mut content = UTF8_BOM.to_vec();
        content.extend_from_slice(b"Formula#,Name,Ingr#,Quantity,Comment\n1,Soup,3,2 lb\n");
        let rows = CsvParser
            .parse(registration(FileType::Formulas), "formulas.csv", &content)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.len(), 5);
        assert_eq!(rows[0].cells[4], "");
    }

    #[test]
    fn test_csv_parser_header_mismatch() {
        let result = parse(FileType::ProductLines, "Product Line\nSoups\n");
        assert!(matches!(result, Err(ImportError::HeaderMismatch { .. })));

        let result = parse(FileType::ProductLines, "");
        assert!(matches!(result, Err(ImportError::HeaderMismatch { .. })));
    }

    #[test]
    fn test_csv_parser_rejects_invalid_utf8() {
        let result = CsvParser.parse(
            registration(FileType::ProductLines),
            "product_lines.csv",
            &[b'N', b'a', b'm', b'e', b'\n', 0xFF, 0xFE],
        );
        assert!(matches!(result, Err(ImportError::Encoding { .. })));
    }

    #[test]
    fn test_csv_parser_quoted_cells() {
        let content = "SKU#,Name,Case UPC,Unit UPC,Unit size,Count per case,PL Name,Formula#,Formula factor,ML Shortnames,Rate,Comment\n\
                       1,Soup,036000291452,012345678905,12 oz,6,Soups,1,,\"L1, L2\",,\n";
        let rows = parse(FileType::Skus, content).unwrap();
        assert_eq!(rows[0].cells[9], "L1, L2");
    }

    #[test]
    fn test_csv_parser_too_many_columns() {
        let result = parse(FileType::ProductLines, "Name\nSoups,extra\n");
        assert!(matches!(result, Err(ImportError::Csv { .. })));
    }
}
