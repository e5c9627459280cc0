use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub const DEFAULT_LOCALE: &str = "en-US";

/// Набор шаблонов сообщений для одной локали.
/// Подстановки в шаблонах имеют вид `{name}`.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    pub malformed_request: &'static str,
    pub missing_file: &'static str,
    pub missing_collection: &'static str,
    pub missing_mapping: &'static str,
    pub invalid_mapping: &'static str,
    pub empty_file: &'static str,
    pub no_valid_items: &'static str,
    pub missing_key_for_upsert: &'static str,
    pub internal_error: &'static str,
    pub processed_items: &'static str,
    pub items_created: &'static str,
}

static MESSAGES: Lazy<HashMap<&'static str, MessageTemplates>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(
        "en-US",
        MessageTemplates {
            malformed_request: "Malformed upload request: {error}",
            missing_file: "Missing Excel file.",
            missing_collection: "Missing target collection.",
            missing_mapping: "Missing mapping.",
            invalid_mapping: "Invalid mapping: {error}",
            empty_file: "Empty Excel file.",
            no_valid_items: "No valid items to import. Check your mapping.",
            missing_key_for_upsert:
                "An item is missing the required key field \"{keyField}\" for upsert.",
            internal_error: "Internal error during Excel import: {error}",
            processed_items: "{count} items processed: {created} created, {updated} updated.",
            items_created: "{count} items successfully created.",
        },
    );
    m.insert(
        "fr-FR",
        MessageTemplates {
            malformed_request: "Requête d’upload invalide : {error}",
            missing_file: "Fichier Excel manquant.",
            missing_collection: "Collection cible manquante.",
            missing_mapping: "Mapping manquant.",
            invalid_mapping: "Mapping invalide : {error}",
            empty_file: "Fichier Excel vide.",
            no_valid_items: "Aucun élément valide à importer. Vérifiez le mapping.",
            missing_key_for_upsert:
                "Un élément ne contient pas la clé \"{keyField}\" requise pour l’upsert.",
            internal_error: "Erreur interne lors de l’import Excel : {error}",
            processed_items:
                "{count} éléments traités : {created} créés, {updated} mis à jour.",
            items_created: "{count} éléments créés avec succès.",
        },
    );
    m.insert(
        "tr-TR",
        MessageTemplates {
            malformed_request: "Geçersiz yükleme isteği: {error}",
            missing_file: "Excel dosyası eksik.",
            missing_collection: "Hedef koleksiyon eksik.",
            missing_mapping: "Eşleştirme eksik.",
            invalid_mapping: "Geçersiz eşleştirme: {error}",
            empty_file: "Excel dosyası boş.",
            no_valid_items: "İçe aktarılacak geçerli öğe yok. Eşleştirmeyi kontrol edin.",
            missing_key_for_upsert:
                "Bir öğede upsert için gereken \"{keyField}\" anahtar alanı eksik.",
            internal_error: "Excel içe aktarımı sırasında dahili hata: {error}",
            processed_items: "{count} öğe işlendi: {created} oluşturuldu, {updated} güncellendi.",
            items_created: "{count} öğe başarıyla oluşturuldu.",
        },
    );
    m
});

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(\w+)\}").unwrap_or_else(|e| panic!("invalid placeholder pattern: {e}"))
});

/// Возвращает тег поддерживаемой локали для подсказки клиента.
///
/// Подсказка может быть значением `Accept-Language`: берётся первый элемент
/// без `;q=`. Сначала ищется точное совпадение тега (без учёта регистра),
/// затем совпадение по языку (`fr` -> `fr-FR`). Иначе `None`.
pub fn resolve_locale(hint: &str) -> Option<&'static str> {
    let first = hint.split(',').next()?.split(';').next()?.trim();
    if first.is_empty() {
        return None;
    }

    if let Some(tag) = MESSAGES.keys().find(|tag| tag.eq_ignore_ascii_case(first)) {
        return Some(*tag);
    }

    let language = first.split(['-', '_']).next()?;
    let mut candidates: Vec<&'static str> = MESSAGES
        .keys()
        .copied()
        .filter(|tag| {
            tag.split('-')
                .next()
                .map(|l| l.eq_ignore_ascii_case(language))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort_unstable();
    candidates.into_iter().next()
}

/// Шаблоны для первой распознанной подсказки, иначе для `fallback`,
/// иначе для `en-US`.
pub fn resolve_messages(hints: &[Option<&str>], fallback: &str) -> &'static MessageTemplates {
    let tag = hints
        .iter()
        .flatten()
        .find_map(|hint| resolve_locale(hint))
        .or_else(|| resolve_locale(fallback))
        .unwrap_or(DEFAULT_LOCALE);
    messages_for(tag)
}

fn messages_for(tag: &str) -> &'static MessageTemplates {
    match MESSAGES.get(tag).or_else(|| MESSAGES.get(DEFAULT_LOCALE)) {
        Some(templates) => templates,
        None => unreachable!("default locale table is always present"),
    }
}

/// Подставляет параметры в шаблон. Неизвестные подстановки заменяются пустой строкой.
pub fn format_message(template: &str, params: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            params
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .into_owned()
}
