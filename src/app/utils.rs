/// 清理文件名中的非法字符
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .replace("/", "_")
        .replace("\\", "_")
        .replace(":", "_")
        .replace("*", "_")
        .replace("?", "_")
        .replace("\"", "_")
        .replace("<", "_")
        .replace(">", "_")
        .replace("|", "_")
        .trim()
        .to_string()
}

/// 公告对应的 PDF 文件名；标题为空时用序号兜底
pub fn pdf_filename(title: &str, index: usize) -> String {
    let name = sanitize_filename(title);
    if name.is_empty() {
        format!("announcement_{}.pdf", index + 1)
    } else {
        format!("{}.pdf", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("巨轮智能：2024年第二次临时股东大会/法律意见书"),
            "巨轮智能：2024年第二次临时股东大会_法律意见书"
        );
        assert_eq!(sanitize_filename("a*b?c\"d<e>f|g"), "a_b_c_d_e_f_g");
        // 中文全角冒号不是非法字符，保持原样
        assert_eq!(sanitize_filename("公告：测试"), "公告：测试");
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("公告A", 0), "公告A.pdf");
        assert_eq!(pdf_filename("", 2), "announcement_3.pdf");
        assert_eq!(pdf_filename("a/b", 0), "a_b.pdf");
    }
}
