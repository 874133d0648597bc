//! Askama page templates.

use askama::Template;
use axum::response::Html;
use domains::{Campground, CampgroundDetail, Identity};

use crate::error::ApiError;
use crate::flash::Flash;
use crate::state::WebSettings;

/// What `base.html` needs on every page.
pub struct Layout {
    pub flash: Option<Flash>,
    pub viewer: Option<Identity>,
    pub login_path: String,
}

impl Layout {
    pub fn new(flash: Option<Flash>, viewer: Option<Identity>, settings: &WebSettings) -> Self {
        Self {
            flash,
            viewer,
            login_path: settings.login_path.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "campgrounds/index.html")]
pub struct IndexTemplate {
    pub layout: Layout,
    pub campgrounds: Vec<Campground>,
}

#[derive(Template)]
#[template(path = "campgrounds/new.html")]
pub struct NewTemplate {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "campgrounds/show.html")]
pub struct ShowTemplate {
    pub layout: Layout,
    pub detail: CampgroundDetail,
    pub is_owner: bool,
    pub liked: bool,
}

impl ShowTemplate {
    pub fn new(layout: Layout, detail: CampgroundDetail) -> Self {
        let (is_owner, liked) = match &layout.viewer {
            Some(identity) => (
                detail.campground.is_owned_by(identity.id),
                detail.campground.is_liked_by(identity.id),
            ),
            None => (false, false),
        };
        Self {
            layout,
            detail,
            is_owner,
            liked,
        }
    }

    fn rating_label(&self) -> String {
        match self.detail.average_rating() {
            Some(avg) => format!("{avg:.1} / 5"),
            None => "No reviews yet".into(),
        }
    }
}

#[derive(Template)]
#[template(path = "campgrounds/edit.html")]
pub struct EditTemplate {
    pub layout: Layout,
    pub campground: Campground,
}

pub fn render(template: &impl Template) -> Result<Html<String>, ApiError> {
    Ok(Html(template.render()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Author, CampgroundFields, Comment, Review, UserId};

    fn identity(name: &str) -> Identity {
        Identity {
            id: UserId::generate(),
            username: name.into(),
        }
    }

    fn layout(flash: Option<Flash>, viewer: Option<Identity>) -> Layout {
        Layout::new(flash, viewer, &WebSettings::default())
    }

    fn campground(owner: &Identity) -> Campground {
        Campground::new(
            Author::from(owner),
            CampgroundFields {
                name: "Pine <Ridge>".into(),
                price: "20".into(),
                description: "quiet".into(),
            },
            None,
        )
    }

    #[test]
    fn index_escapes_names() {
        let owner = identity("owner");
        let html = IndexTemplate {
            layout: layout(None, None),
            campgrounds: vec![campground(&owner)],
        }
        .render()
        .unwrap();

        assert!(html.contains("Pine &#60;Ridge&#62;") || html.contains("Pine &lt;Ridge&gt;"));
    }

    #[test]
    fn show_offers_edit_only_to_owner() {
        let owner = identity("owner");
        let camp = campground(&owner);
        let detail = CampgroundDetail::new(camp.clone(), vec![], vec![]);

        let as_owner = ShowTemplate::new(layout(None, Some(owner)), detail.clone()).render().unwrap();
        let as_guest = ShowTemplate::new(layout(None, None), detail).render().unwrap();

        let edit_link = format!("/campgrounds/{}/edit", camp.id);
        assert!(as_owner.contains(&edit_link));
        assert!(!as_guest.contains(&edit_link));
    }

    #[test]
    fn show_lists_comments_and_rating() {
        let owner = identity("owner");
        let camp = campground(&owner);
        let detail = CampgroundDetail::new(
            camp.clone(),
            vec![Comment::new(camp.id, Author::from(&owner), "lovely creek")],
            vec![Review::new(camp.id, Author::from(&owner), 4, "good")],
        );

        let html = ShowTemplate::new(layout(None, None), detail).render().unwrap();

        assert!(html.contains("lovely creek"));
        assert!(html.contains("4.0 / 5"));
    }

    #[test]
    fn flash_is_rendered_with_its_class() {
        let html = NewTemplate {
            layout: layout(
                Some(Flash::error("Only image files are allowed!")),
                Some(identity("camper")),
            ),
        }
        .render()
        .unwrap();

        assert!(html.contains("alert-danger"));
        assert!(html.contains("Only image files are allowed!"));
    }

    #[test]
    fn login_link_follows_configured_path() {
        let settings = WebSettings {
            login_path: "/auth/sign-in".into(),
            ..WebSettings::default()
        };
        let html = IndexTemplate {
            layout: Layout::new(None, None, &settings),
            campgrounds: vec![],
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"href="/auth/sign-in""#));
        assert!(!html.contains(r#"href="/login""#));
    }
}
