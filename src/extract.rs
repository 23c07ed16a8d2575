use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::models::JobRecord;

/// Sentinel stored when a detail page could not be fetched or has no
/// recognizable description container.
pub const MISSING_DESCRIPTION: &str = "Could not find Job Description";

const JOB_VIEW_URL: &str = "https://www.linkedin.com/jobs/view";

/// Parse the job cards out of one search-results page. A page without the
/// expected card structure (empty or blocked) yields an empty vec, never an
/// error.
pub fn extract_listings(document: &Html) -> Vec<JobRecord> {
    let (Ok(card_sel), Ok(title_sel), Ok(company_sel), Ok(location_sel), Ok(date_sel), Ok(new_date_sel)) = (
        Selector::parse("div.base-search-card__info"),
        Selector::parse("h3"),
        Selector::parse("a.hidden-nested-link"),
        Selector::parse("span.job-search-card__location"),
        Selector::parse("time.job-search-card__listdate"),
        Selector::parse("time.job-search-card__listdate--new"),
    ) else {
        return Vec::new();
    };

    let mut jobs = Vec::new();
    for card in document.select(&card_sel) {
        let title = card
            .select(&title_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let company = card
            .select(&company_sel)
            .next()
            .map(|a| element_text(a).replace('\n', " "))
            .unwrap_or_default();
        let location = card
            .select(&location_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        // The posting id lives on the card's parent container as
        // data-entity-urn="urn:li:jobPosting:<ID>".
        let job_url = card
            .parent()
            .and_then(ElementRef::wrap)
            .and_then(|parent| parent.value().attr("data-entity-urn"))
            .and_then(|urn| urn.rsplit(':').next())
            .filter(|id| !id.is_empty())
            .map(|id| format!("{JOB_VIEW_URL}/{id}/"))
            .unwrap_or_default();

        // Standard date element first, "new listing" variant as fallback.
        let posting_date = card
            .select(&date_sel)
            .next()
            .or_else(|| card.select(&new_date_sel).next())
            .and_then(|time| time.value().attr("datetime"))
            .unwrap_or_default()
            .to_string();

        jobs.push(JobRecord {
            title,
            company,
            location,
            posting_date,
            job_url,
            ..Default::default()
        });
    }

    jobs
}

/// Extract the free-text description from a job-detail document. `None`
/// (fetch soft-failure) and a page without the rich-text container both
/// yield the same sentinel.
pub fn extract_description(document: Option<&Html>) -> String {
    let Some(document) = document else {
        return MISSING_DESCRIPTION.to_string();
    };
    let Ok(selector) = Selector::parse("div.description__text.description__text--rich") else {
        return MISSING_DESCRIPTION.to_string();
    };
    let Some(container) = document.select(&selector).next() else {
        return MISSING_DESCRIPTION.to_string();
    };

    let mut pieces: Vec<String> = Vec::new();
    collect_visible_text(*container, &mut pieces);

    let text = pieces.join("\n").trim().to_string();
    let text = text.replace("\n\n", "");
    let text = text.replace("::marker", "-");
    let text = text.replace("-\n", "- ");
    text.replace("Show less", "").replace("Show more", "")
}

/// Walks the description tree in document order, dropping `span`/`a`
/// subtrees outright (text included) and emitting a "-" marker before every
/// list item.
fn collect_visible_text(node: NodeRef<'_, Node>, out: &mut Vec<String>) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            Node::Element(element) => {
                let name = element.name();
                if name == "span" || name == "a" {
                    continue;
                }
                if name == "li" {
                    out.push("-".to_string());
                }
                collect_visible_text(child, out);
            }
            _ => {}
        }
    }
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"
        <html><body>
        <div data-entity-urn="urn:li:jobPosting:12345">
            <div class="base-search-card__info">
                <h3> Rust Engineer </h3>
                <a class="hidden-nested-link">Acme
Corp</a>
                <span class="job-search-card__location">Berlin</span>
                <time class="job-search-card__listdate" datetime="2024-05-01">1 day ago</time>
            </div>
        </div>
        <div data-entity-urn="urn:li:jobPosting:67890">
            <div class="base-search-card__info">
                <h3>Backend Developer</h3>
                <time class="job-search-card__listdate--new" datetime="2024-05-02">new</time>
            </div>
        </div>
        </body></html>"#;

    #[test]
    fn test_extract_listings_full_card() {
        let document = Html::parse_document(LISTING_PAGE);
        let jobs = extract_listings(&document);
        assert_eq!(jobs.len(), 2);

        let job = &jobs[0];
        assert_eq!(job.title, "Rust Engineer");
        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.location, "Berlin");
        assert_eq!(job.posting_date, "2024-05-01");
        assert_eq!(job.job_url, "https://www.linkedin.com/jobs/view/12345/");
        assert_eq!(job.job_description, "");
        assert!(!job.applied && !job.hidden && !job.interview && !job.rejected);
    }

    #[test]
    fn test_extract_listings_missing_optional_fields() {
        let document = Html::parse_document(LISTING_PAGE);
        let jobs = extract_listings(&document);
        let job = &jobs[1];
        assert_eq!(job.title, "Backend Developer");
        assert_eq!(job.company, "");
        assert_eq!(job.location, "");
        // The --new variant is only a fallback, but here it is the only one.
        assert_eq!(job.posting_date, "2024-05-02");
    }

    #[test]
    fn test_extract_listings_prefers_standard_date_element() {
        let page = r#"
            <div data-entity-urn="urn:li:jobPosting:1">
                <div class="base-search-card__info">
                    <h3>Engineer</h3>
                    <time class="job-search-card__listdate--new" datetime="2024-05-09">x</time>
                    <time class="job-search-card__listdate" datetime="2024-05-08">x</time>
                </div>
            </div>"#;
        let document = Html::parse_document(page);
        let jobs = extract_listings(&document);
        assert_eq!(jobs[0].posting_date, "2024-05-08");
    }

    #[test]
    fn test_extract_listings_empty_page() {
        let document = Html::parse_document("<html><body><p>blocked</p></body></html>");
        assert!(extract_listings(&document).is_empty());
    }

    #[test]
    fn test_extract_listings_skips_card_without_title() {
        let page = r#"<div><div class="base-search-card__info">
            <span class="job-search-card__location">Nowhere</span>
        </div></div>"#;
        let document = Html::parse_document(page);
        assert!(extract_listings(&document).is_empty());
    }

    #[test]
    fn test_extract_listings_no_urn_means_empty_url() {
        let page = r#"<div><div class="base-search-card__info"><h3>Engineer</h3></div></div>"#;
        let document = Html::parse_document(page);
        let jobs = extract_listings(&document);
        assert_eq!(jobs[0].job_url, "");
    }

    #[test]
    fn test_extract_description_missing_document() {
        assert_eq!(extract_description(None), MISSING_DESCRIPTION);
    }

    #[test]
    fn test_extract_description_missing_container() {
        let document = Html::parse_document("<html><body><div>nothing here</div></body></html>");
        assert_eq!(extract_description(Some(&document)), MISSING_DESCRIPTION);
    }

    #[test]
    fn test_extract_description_strips_spans_and_links() {
        let page = r##"<div class="description__text description__text--rich">
            <p>Build services in Rust.</p><span>Show more</span><a href="#">apply here</a><p>Ship weekly.</p>
        </div>"##;
        let document = Html::parse_document(page);
        let text = extract_description(Some(&document));
        assert!(text.contains("Build services in Rust."));
        assert!(text.contains("Ship weekly."));
        assert!(!text.contains("Show more"));
        assert!(!text.contains("apply here"));
    }

    #[test]
    fn test_extract_description_bullets_get_markers() {
        let page = r#"<div class="description__text description__text--rich"><p>Stack:</p><ul><li>Rust</li><li>SQLite</li></ul></div>"#;
        let document = Html::parse_document(page);
        let text = extract_description(Some(&document));
        assert!(text.contains("- Rust"), "got: {text:?}");
        assert!(text.contains("- SQLite"), "got: {text:?}");
    }

    #[test]
    fn test_extract_description_boilerplate_removed() {
        let page = r#"<div class="description__text description__text--rich"><p>Great job::marker really.</p><p>Show less</p></div>"#;
        let document = Html::parse_document(page);
        let text = extract_description(Some(&document));
        assert!(text.contains("Great job- really."));
        assert!(!text.contains("Show less"));
    }
}
