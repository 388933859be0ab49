//! 文件类型识别与文本抽取 - 业务能力层
//!
//! 先看扩展名，认不出再看 magic bytes。CSV / 纯文本在本地解码；
//! PDF 由调用方转交 OCR 服务；Excel 在这条流水线里不支持。

use crate::error::FileError;

/// 识别出的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Excel,
    Pdf,
    Text,
    Unknown,
}

/// 根据扩展名和内容识别文件类型
pub fn detect_file_type(file_name: &str, content: &[u8]) -> FileType {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => FileType::Csv,
        "xlsx" | "xls" => FileType::Excel,
        "pdf" => FileType::Pdf,
        "txt" => FileType::Text,
        _ => detect_by_magic_bytes(content),
    }
}

/// 按文件头字节识别真实类型
fn detect_by_magic_bytes(content: &[u8]) -> FileType {
    if content.len() < 4 {
        return FileType::Unknown;
    }

    // XLSX: PK (zip 头)
    if content[0] == 0x50 && content[1] == 0x4B {
        return FileType::Excel;
    }

    // PDF: %PDF
    if &content[..4] == b"%PDF" {
        return FileType::Pdf;
    }

    let sample_len = content.len().min(1000);
    if let Ok(text) = std::str::from_utf8(&content[..sample_len]) {
        if is_valid_text(text) {
            return FileType::Text;
        }
    }

    FileType::Unknown
}

/// 是否为有效文本（不含二进制控制字符）
fn is_valid_text(text: &str) -> bool {
    text.chars()
        .all(|c| c as u32 >= 32 || c == '\t' || c == '\n' || c == '\r')
}

/// 抽取非 PDF 文件的文本内容
///
/// PDF 不在这里处理：调用方先用 `detect_file_type` 分流，PDF 走 OCR。
pub fn extract_text(file_name: &str, content: &[u8]) -> Result<String, FileError> {
    match detect_file_type(file_name, content) {
        FileType::Csv | FileType::Text => {
            let text = std::str::from_utf8(content).map_err(|_| FileError::InvalidEncoding {
                path: file_name.to_string(),
            })?;
            Ok(text.to_string())
        }
        FileType::Excel => Err(FileError::UnsupportedType {
            detected: "excel".to_string(),
        }),
        FileType::Pdf => Err(FileError::UnsupportedType {
            detected: "pdf (debe ir por OCR)".to_string(),
        }),
        FileType::Unknown => Err(FileError::UnsupportedType {
            detected: "unknown".to_string(),
        }),
    }
}
