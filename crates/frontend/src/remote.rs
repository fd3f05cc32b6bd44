use polygon_tools_shared::models::{ImportedFeature, RemoteLayer};
use polygon_tools_shared::wfs;

/// Ask for a service URL, then a layer name. Cancelling either prompt aborts
/// and the second question is never asked after a cancel. Values are not validated.
pub fn prompt_layer(
    service: &str,
    mut ask: impl FnMut(&str) -> Option<String>,
) -> Option<RemoteLayer> {
    let url = ask(&format!("Enter {service} URL:"))?;
    let layer_name = ask(&format!("Enter {service} layer name:"))?;
    Some(RemoteLayer { url, layer_name })
}

/// GET a WFS endpoint and decode its GeoJSON FeatureCollection.
pub async fn fetch_wfs(url: &str) -> Result<Vec<ImportedFeature>, String> {
    let resp = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("WFS request failed with status {}", resp.status()));
    }

    let body = resp.text().await.map_err(|e| e.to_string())?;
    wfs::parse_feature_collection(&body).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Asked = Rc<RefCell<Vec<String>>>;

    /// Prompt stand-in answering from a script and recording each question.
    fn scripted(answers: Vec<Option<&'static str>>) -> (impl FnMut(&str) -> Option<String>, Asked) {
        let asked: Asked = Rc::default();
        let log = asked.clone();
        let mut answers = answers.into_iter();
        let ask = move |question: &str| {
            log.borrow_mut().push(question.to_string());
            answers.next().flatten().map(str::to_string)
        };
        (ask, asked)
    }

    #[test]
    fn test_prompt_layer_both_answered() {
        let (ask, asked) = scripted(vec![Some("https://example.com/wfs"), Some("topp:states")]);
        let layer = prompt_layer("WFS", ask).unwrap();
        assert_eq!(layer.url, "https://example.com/wfs");
        assert_eq!(layer.layer_name, "topp:states");
        assert_eq!(*asked.borrow(), vec!["Enter WFS URL:", "Enter WFS layer name:"]);
    }

    #[test]
    fn test_prompt_layer_cancel_url_skips_name() {
        let (ask, asked) = scripted(vec![None, Some("never")]);
        assert!(prompt_layer("WMS", ask).is_none());
        assert_eq!(asked.borrow().len(), 1);
    }

    #[test]
    fn test_prompt_layer_cancel_name_aborts() {
        let (ask, _) = scripted(vec![Some("https://example.com/wms"), None]);
        assert!(prompt_layer("WMS", ask).is_none());
    }

    #[test]
    fn test_prompt_layer_keeps_empty_strings() {
        let (ask, _) = scripted(vec![Some(""), Some("")]);
        let layer = prompt_layer("WMS", ask).unwrap();
        assert!(layer.url.is_empty());
        assert!(layer.layer_name.is_empty());
    }
}
