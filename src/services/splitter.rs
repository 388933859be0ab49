//! 页切分器 - 业务能力层
//!
//! 把抽取出的全文按页边界标记切成 chunk。每页以一行固定前缀的分隔
//! 标记结尾，标记行本身丢弃。惰性迭代，只向前扫描。
//!
//! 注意：最后一个标记之后的尾部内容不会作为 chunk 产出（没有结束
//! 标记的残页被丢弃，与上游 OCR 约定一致：完整页面一定带结束标记）。

/// 页边界标记的行前缀
pub const PAGE_MARKER: &str = "------------------------- FIN PÁGINA";

/// 按页边界惰性切分的迭代器
pub struct PageSplitter<'a> {
    lines: std::str::Lines<'a>,
    marker: &'a str,
}

impl<'a> PageSplitter<'a> {
    pub fn with_marker(text: &'a str, marker: &'a str) -> Self {
        Self {
            lines: text.lines(),
            marker,
        }
    }
}

/// 用默认页标记切分文档全文
pub fn split_pages(text: &str) -> PageSplitter<'_> {
    PageSplitter::with_marker(text, PAGE_MARKER)
}

impl Iterator for PageSplitter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut buffer = String::new();
        for line in self.lines.by_ref() {
            if line.starts_with(self.marker) {
                // 标记行之前有内容才算一页；连续两个标记之间没有行，跳过
                if !buffer.is_empty() {
                    return Some(buffer.trim().to_string());
                }
            } else {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
        // 尾部没有标记收尾的内容不产出
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_line() -> String {
        format!("{} 1 -------------------------", PAGE_MARKER)
    }

    #[test]
    fn test_two_pages_in_order() {
        let text = format!(
            "linea a1\nlinea a2\n{m}\nlinea b1\n{m}\n",
            m = marker_line()
        );
        let chunks: Vec<String> = split_pages(&text).collect();
        assert_eq!(chunks, vec!["linea a1\nlinea a2", "linea b1"]);
    }

    #[test]
    fn test_chunks_are_trimmed() {
        let text = format!("\n  contenido  \n\n{}\n", marker_line());
        let chunks: Vec<String> = split_pages(&text).collect();
        assert_eq!(chunks, vec!["contenido"]);
    }

    #[test]
    fn test_no_marker_yields_nothing() {
        let chunks: Vec<String> = split_pages("texto sin marcador\notra linea\n").collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let chunks: Vec<String> = split_pages("").collect();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_trailing_page_without_marker_is_dropped() {
        let text = format!("pagina 1\n{}\npagina suelta sin marcador\n", marker_line());
        let chunks: Vec<String> = split_pages(&text).collect();
        assert_eq!(chunks, vec!["pagina 1"]);
    }

    #[test]
    fn test_consecutive_markers_skip_empty_page() {
        let text = format!("pagina 1\n{m}\n{m}\npagina 2\n{m}\n", m = marker_line());
        let chunks: Vec<String> = split_pages(&text).collect();
        assert_eq!(chunks, vec!["pagina 1", "pagina 2"]);
    }

    #[test]
    fn test_marker_prefix_match_ignores_suffix() {
        // 标记行后面往往带页码等后缀，按前缀识别
        let text = format!("{} 99 ----\n", PAGE_MARKER);
        let text = format!("contenido\n{}", text);
        let chunks: Vec<String> = split_pages(&text).collect();
        assert_eq!(chunks, vec!["contenido"]);
    }

    #[test]
    fn test_lazy_iteration() {
        let text = format!("p1\n{m}\np2\n{m}\np3\n{m}\n", m = marker_line());
        let mut iter = split_pages(&text);
        assert_eq!(iter.next().as_deref(), Some("p1"));
        assert_eq!(iter.next().as_deref(), Some("p2"));
        assert_eq!(iter.next().as_deref(), Some("p3"));
        assert_eq!(iter.next(), None);
    }
}
