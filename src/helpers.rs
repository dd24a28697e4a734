use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, JsonValue, Output, RenderContext,
    RenderError, RenderErrorReason,
};

/// `{{quote_list keywords}}`: turns `a, b` (or a JSON array) into the Python
/// literal items `'a', 'b'`.
#[derive(Clone, Copy)]
pub struct QuoteListHelper;

impl HelperDef for QuoteListHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h
            .param(0)
            .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex("quote_list", 0))?;

        let items: Vec<&str> = match value.value() {
            JsonValue::String(list) => list.split(',').collect(),
            JsonValue::Array(list) => list.iter().filter_map(JsonValue::as_str).collect(),
            _ => {
                return if r.strict_mode() {
                    Err(RenderError::strict_error(value.relative_path()))
                } else {
                    Ok(())
                };
            }
        };
        out.write(&quote_items(items))?;
        Ok(())
    }
}

/// `{{py_str author}}`: the value as a single-quoted Python string literal.
/// Several params are concatenated first, so
/// `{{py_str "Topic :: " topic}}` yields one literal.
#[derive(Clone, Copy)]
pub struct PyStrHelper;

impl HelperDef for PyStrHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        if h.params().is_empty() {
            return Err(RenderErrorReason::ParamNotFoundForIndex("py_str", 0).into());
        }
        let mut text = String::new();
        for param in h.params() {
            match param.value() {
                JsonValue::String(part) => text.push_str(part),
                JsonValue::Number(part) => text.push_str(&part.to_string()),
                _ if r.strict_mode() => {
                    return Err(RenderError::strict_error(param.relative_path()));
                }
                _ => {}
            }
        }
        out.write(&py_literal(&text))?;
        Ok(())
    }
}

fn py_literal(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn quote_items<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(py_literal)
        .collect::<Vec<_>>()
        .join(", ")
}
