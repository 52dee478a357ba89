use minijinja::Environment;
use serde::Serialize;

use crate::error::QuizError;

const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("quiz.html", include_str!("../templates/quiz.html")),
    ("upload.html", include_str!("../templates/upload.html")),
    ("leaderboard.html", include_str!("../templates/leaderboard.html")),
];

/// HTML pages compiled into the binary.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, QuizError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, QuizError> {
        Ok(self.env.get_template(name)?.render(ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn all_templates_compile() {
        let t = Templates::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(t.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn gallery_escapes_member_names() {
        let t = Templates::new().unwrap();
        let html = t
            .render(
                "index.html",
                context! {
                    members => vec![context! { name => "<b>Kim</b>", image_url => "/x.jpg", bio => "" }],
                    member_count => 1,
                },
            )
            .unwrap();
        assert!(html.contains("&lt;b&gt;Kim&lt;/b&gt;"));
        assert!(!html.contains("<b>Kim</b>"));
    }

    #[test]
    fn quiz_shows_error_state() {
        let t = Templates::new().unwrap();
        let html = t
            .render(
                "quiz.html",
                context! { members => Vec::<String>::new(), error => "need more members" },
            )
            .unwrap();
        assert!(html.contains("need more members"));
    }
}
