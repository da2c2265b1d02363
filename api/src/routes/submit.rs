//! Submission echo
//!
//! Accepts what the form posts and answers with a response document: repeated
//! keys are joined with ", " and uploaded files are embedded by MIME type.

use crate::{ApiError, ServerState};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::Form;
use contact_form::{EncodedFileRef, Markup, ResolvedEntry, ResolvedForm, ResolvedValue};
use std::collections::HashMap;
use std::sync::Arc;

/// Title used when the configuration cannot be loaded
const FALLBACK_TITLE: &str = "Contact Form";

/// One submitted form part
#[derive(Debug)]
enum Part {
    Text { name: String, value: String },
    File { name: String, file: EncodedFileRef },
}

/// Echo a submission as a response document
pub async fn submit(
    State(state): State<Arc<ServerState>>,
    request: Request,
) -> Result<Html<String>, ApiError> {
    let multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let parts = if multipart {
        let multipart = Multipart::from_request(request, &state).await?;
        read_multipart(multipart).await?
    } else {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &state).await?;
        pairs
            .into_iter()
            .map(|(name, value)| Part::Text { name, value })
            .collect()
    };

    // labels and title come from the configuration when it is available
    let (title, labels) = match state.loader.load(&state.source).await {
        Ok(config) => {
            let labels: HashMap<String, Markup> = config
                .questions
                .into_iter()
                .map(|q| (q.name, q.label))
                .collect();
            (config.title, labels)
        }
        Err(error) => {
            tracing::warn!(error = %error, "echoing submission without configuration");
            (FALLBACK_TITLE.to_string(), HashMap::new())
        }
    };

    let resolved = echo_form(parts, &labels);
    tracing::info!(
        fields = resolved.entries.len(),
        files = resolved.file_count(),
        "submission received"
    );
    let document = state.generator.render(&title, &resolved)?;
    Ok(Html(document.html))
}

async fn read_multipart(mut multipart: Multipart) -> Result<Vec<Part>, ApiError> {
    let mut parts = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            // a file control with nothing selected
            Some(file_name) if file_name.is_empty() => {
                field.bytes().await?;
                parts.push(Part::Text { name, value: String::new() });
            }
            Some(file_name) => {
                let mime = field.content_type().map(str::to_string).unwrap_or_else(|| {
                    mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string()
                });
                let bytes = field.bytes().await?;
                tracing::debug!(
                    field = %name,
                    file = %file_name,
                    mime = %mime,
                    bytes = bytes.len(),
                    "file received"
                );
                parts.push(Part::File {
                    name,
                    file: EncodedFileRef::encode(&file_name, &mime, &bytes),
                });
            }
            None => {
                let value = field.text().await?;
                parts.push(Part::Text { name, value });
            }
        }
    }

    Ok(parts)
}

/// Group parts by name in first-seen order. Files take over a name that also
/// carried plain values.
fn echo_form(parts: Vec<Part>, labels: &HashMap<String, Markup>) -> ResolvedForm {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<ResolvedEntry> = Vec::new();

    for part in parts {
        let name = match &part {
            Part::Text { name, .. } | Part::File { name, .. } => name.clone(),
        };
        let slot = *slots.entry(name.clone()).or_insert_with(|| {
            entries.push(ResolvedEntry {
                label: labels.get(&name).cloned().unwrap_or_else(|| Markup::text(&name)),
                name: name.clone(),
                value: ResolvedValue::Choice(Vec::new()),
            });
            entries.len() - 1
        });

        let entry = &mut entries[slot];
        match (part, &mut entry.value) {
            (Part::Text { value, .. }, ResolvedValue::Choice(values)) => values.push(value),
            (Part::Text { .. }, _) => {}
            (Part::File { file, .. }, ResolvedValue::Files(files)) => files.push(file),
            (Part::File { file, .. }, value) => *value = ResolvedValue::Files(vec![file]),
        }
    }

    ResolvedForm { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{router, send, state, CONFIG};
    use crate::build_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use scraper::{ElementRef, Html as Document, Selector};

    fn value_after_label<'a>(doc: &'a Document, name: &str) -> ElementRef<'a> {
        let selector = Selector::parse(&format!(r#"label[for="{name}"]"#)).unwrap();
        let label = doc.select(&selector).next().unwrap();
        label.next_siblings().find_map(ElementRef::wrap).unwrap()
    }

    #[tokio::test]
    async fn test_urlencoded_echo() {
        let (app, _dir) = router(CONFIG);
        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Ada+Lovelace&country=USA&country=CAN"))
            .unwrap();
        let (response, body) = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = Document::parse_document(&body);
        assert_eq!(value_after_label(&doc, "name").inner_html(), "Ada Lovelace");
        assert_eq!(value_after_label(&doc, "country").inner_html(), "USA, CAN");

        let label = Selector::parse("label[for=country] b").unwrap();
        assert!(doc.select(&label).next().is_some());
    }

    #[tokio::test]
    async fn test_multipart_echo_embeds_files() {
        let (app, _dir) = router(CONFIG);
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Ada\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"photo\"; filename=\"cat.png\"\r\n",
            "Content-Type: image/png\r\n\r\n",
            "PNGDATA\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"resume\"; filename=\"cv.pdf\"\r\n\r\n",
            "%PDF\r\n",
            "--XBOUNDARY--\r\n",
        );
        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let (response, body) = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = Document::parse_document(&body);
        assert_eq!(value_after_label(&doc, "name").inner_html(), "Ada");

        let img = Selector::parse("img").unwrap();
        let src = value_after_label(&doc, "photo")
            .select(&img)
            .next()
            .and_then(|e| e.value().attr("src"))
            .unwrap();
        assert_eq!(src, "data:image/png;base64,UE5HREFUQQ==");

        let link = Selector::parse("a").unwrap();
        let href = value_after_label(&doc, "resume")
            .select(&link)
            .next()
            .and_then(|e| e.value().attr("href"))
            .unwrap();
        assert!(href.starts_with("data:application/pdf;base64,"));
    }

    #[tokio::test]
    async fn test_malformed_multipart_rejected() {
        let (app, _dir) = router(CONFIG);
        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "multipart/form-data")
            .body(Body::from("garbage"))
            .unwrap();
        let (response, _) = send(app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn multipart_upload(name: &str, file_name: &str, mime: &str, data: &[u8]) -> Body {
        let mut body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
        Body::from(body)
    }

    #[tokio::test]
    async fn test_large_upload_accepted() {
        let (app, _dir) = router(CONFIG);
        let video = vec![0u8; 3 * 1024 * 1024];
        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(multipart_upload("clip", "clip.mp4", "video/mp4", &video))
            .unwrap();
        let (response, body) = send(app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = Document::parse_document(&body);
        let video = Selector::parse("video").unwrap();
        assert!(value_after_label(&doc, "clip").select(&video).next().is_some());
    }

    #[tokio::test]
    async fn test_oversized_body_reports_payload_too_large() {
        let (state, _dir) = state(CONFIG);
        let app = build_router(state.with_body_limit(1024));
        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(multipart_upload("photo", "cat.png", "image/png", &[7u8; 4096]))
            .unwrap();
        let (response, body) = send(app.clone(), request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body.contains("payload_too_large"));

        let request = Request::post("/submit")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("name={}", "a".repeat(4096))))
            .unwrap();
        let (response, _) = send(app, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_files_take_over_name() {
        let parts = vec![
            Part::Text { name: "upload".into(), value: String::new() },
            Part::File {
                name: "upload".into(),
                file: EncodedFileRef::encode("a.png", "image/png", b"a"),
            },
        ];
        let form = echo_form(parts, &HashMap::new());
        assert_eq!(form.entries.len(), 1);
        assert_eq!(form.file_count(), 1);
    }
}
