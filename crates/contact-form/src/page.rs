//! Page rendering
//!
//! A ready form renders inside `.container` with its instructions. A failed
//! configuration load hides the container and shows the error message.

use crate::error::Result;
use crate::form::Form;
use handlebars::Handlebars;
use serde::Serialize;

/// Title used when no configuration could be loaded
const ERROR_TITLE: &str = "Contact Form";

/// What the page currently shows
#[derive(Debug, Clone)]
pub enum PageView {
    Form(Box<Form>),
    Error(String),
}

impl PageView {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Serialize)]
struct PageData<'a> {
    title: &'a str,
    instructions: &'a str,
    form: String,
    error: Option<&'a str>,
}

pub struct PageRenderer {
    handlebars: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut hb = Handlebars::new();
        hb.register_template_string("index", INDEX_TEMPLATE)?;
        Ok(Self { handlebars: hb })
    }

    pub fn render(&self, view: &PageView) -> Result<String> {
        let data = match view {
            PageView::Form(form) => PageData {
                title: &form.title,
                instructions: form.instructions.as_ref().map_or("", |m| m.as_str()),
                form: form.render(),
                error: None,
            },
            PageView::Error(message) => PageData {
                title: ERROR_TITLE,
                instructions: "",
                form: String::new(),
                error: Some(message),
            },
        };
        Ok(self.handlebars.render("index", &data)?)
    }
}

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{title}}</title>
<style>
body {
  background-color: #1e1e1e; color: #e0e0e0;
  font-family: Arial, sans-serif; margin: 0; padding: 20px;
}
.container {
  width: 600px; margin: 0 auto; background-color: #2b2b2b;
  padding: 20px; border-radius: 8px;
}
label { display: block; font-weight: bold; margin-top: 16px; }
input, select, textarea { width: 100%; box-sizing: border-box; margin-top: 4px; }
#error-message { color: red; text-align: center; }
[data-copy] { cursor: pointer; text-decoration: underline; }
</style>
</head>
<body>
<div class="container"{{#if error}} hidden{{/if}}>
<h1>{{title}}</h1>
<div id="instructions">{{{instructions}}}</div>
{{{form}}}
</div>
{{#if error}}
<div id="error-message">{{error}}</div>
{{/if}}
</body>
</html>
"#;
