use mavs_core::TranslationKind;
use mavs_db::{ArticleRow, ArticleTranslations};
use mavs_translate::Translator;

/// What a translation attempt produced for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleTranslationOutcome {
    pub translations: ArticleTranslations,
    pub failed_fields: Vec<TranslationKind>,
}

impl ArticleTranslationOutcome {
    /// Something new can be written back.
    #[must_use]
    pub fn made_progress(&self) -> bool {
        !self.translations.is_empty()
    }
}

/// Translates every pending field of `article`, title first.
///
/// A failed title ends the attempt: content and summary only move forward
/// once the article has a translated title. Content and summary failures
/// are recorded and leave those fields pending.
pub async fn translate_article(
    translator: &Translator,
    article: &ArticleRow,
) -> ArticleTranslationOutcome {
    let mut outcome = ArticleTranslationOutcome::default();

    for kind in article.pending_fields() {
        let Some(text) = article.source_text(kind) else {
            continue;
        };
        match translator.translate(text, kind).await {
            Ok(translated) if !translated.is_empty() => outcome.translations.set(kind, translated),
            Ok(_) => outcome.failed_fields.push(kind),
            Err(e) => {
                tracing::warn!(
                    article_id = article.id,
                    kind = %kind,
                    exhausted = e.is_exhausted(),
                    error = %e,
                    "translation failed; article stays pending"
                );
                outcome.failed_fields.push(kind);
                if kind == TranslationKind::Title {
                    break;
                }
            }
        }
    }

    outcome
}
