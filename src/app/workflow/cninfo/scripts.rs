//! 注入页面的 JS 片段。选择器都经过 JSON 转义后拼进脚本。

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// 往输入框写值。Element-UI 的日期控件不响应直接赋值，
/// 需要补发 input/change 事件。
pub fn fill_input_js(selector: &str, value: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.value = {val};
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()
        "#,
        sel = js_string(selector),
        val = js_string(value),
    )
}

/// 按文本找按钮并点击（查询按钮没有稳定的 class）
pub fn click_button_by_text_js(text: &str) -> String {
    format!(
        r#"
        (() => {{
            const btns = [...document.querySelectorAll('button')]
                .filter(b => b.textContent.trim().includes({text}));
            if (btns.length) {{ btns[0].click(); return true; }}
            return false;
        }})()
        "#,
        text = js_string(text),
    )
}

/// 直接查询下一页按钮的 disabled 属性
pub fn disabled_probe_js(selector: &str) -> String {
    format!(
        r#"
        (() => {{
            const btn = document.querySelector({sel});
            if (!btn) return false;
            return btn.disabled === true;
        }})()
        "#,
        sel = js_string(selector),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_escaped() {
        let js = fill_input_js("input[placeholder=\"开始日期\"]", "2025-07-01");
        assert!(js.contains(r#""input[placeholder=\"开始日期\"]""#));
        assert!(js.contains("\"2025-07-01\""));

        let js = click_button_by_text_js("查询");
        assert!(js.contains("\"查询\""));

        let js = disabled_probe_js("button.btn-next");
        assert!(js.contains("\"button.btn-next\""));
        assert!(js.contains("disabled === true"));
    }
}
