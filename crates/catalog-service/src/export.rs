//! Admin exports: CSV tables, full JSON dump, and the printable report

use awire_common::{Artisan, Category, CraftItem, Photo, SiteConfig, Village};
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::Catalog;

const BOM: &str = "\u{FEFF}";
const DELIMITER: &str = ";";
pub const EXPORT_VERSION: &str = "1.0";

/// Rows a report page holds below its header
pub const REPORT_ROWS_PER_PAGE: usize = 25;
const REPORT_MAX_COLUMN_WIDTH: usize = 40;

const INSTITUTIONAL_HEADER: [&str; 5] = [
    "MINISTÉRIO DA EDUCAÇÃO",
    "SECRETARIA DE EDUCAÇÃO PROFISSIONAL E TECNOLÓGICA",
    "INSTITUTO FEDERAL DE EDUCAÇÃO, CIÊNCIA E TECNOLOGIA DO TOCANTINS",
    "CAMPUS FORMOSO DO ARAGUAIA",
    "PROJETO DE EXTENSÃO AWIRE DIGITAL",
];
const REPORT_COPYRIGHT: &str = "© 2025 AWIRE DIGITAL - Todos os direitos reservados";

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Dates are shown on Brasília time (UTC-3, no daylight saving)
fn brasilia(date: DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::west_opt(3 * 3600) {
        Some(offset) => date.with_timezone(&offset),
        None => date.fixed_offset(),
    }
}

/// `dd/mm/yyyy`
pub fn format_date(date: DateTime<Utc>) -> String {
    brasilia(date).format("%d/%m/%Y").to_string()
}

/// `18 de outubro de 2026`
pub fn format_long_date(date: DateTime<Utc>) -> String {
    let local = brasilia(date);
    format!(
        "{:02} de {} de {}",
        local.day(),
        MONTHS[local.month0() as usize],
        local.year()
    )
}

/// Which entity list an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    CraftItems,
    Artisans,
}

impl ExportTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "craft-items" | "artesanatos" => Some(ExportTarget::CraftItems),
            "artisans" | "artesaos" => Some(ExportTarget::Artisans),
            _ => None,
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportTarget::CraftItems => "artesanatos_awire",
            ExportTarget::Artisans => "artesaos_awire",
        }
    }

    pub fn report_title(&self) -> &'static str {
        match self {
            ExportTarget::CraftItems => "RELATÓRIO DE ARTESANATOS CADASTRADOS",
            ExportTarget::Artisans => "RELATÓRIO DE ARTESÃOS CADASTRADOS",
        }
    }

    pub async fn table(&self, catalog: &Catalog) -> Table {
        match self {
            ExportTarget::CraftItems => craft_items_table(&catalog.craft_items().await),
            ExportTarget::Artisans => artisans_table(&catalog.artisans().await),
        }
    }
}

/// Labelled columns and their string cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

pub fn craft_items_table(items: &[CraftItem]) -> Table {
    Table {
        columns: vec!["Nome", "Descrição", "Categoria", "Aldeia", "Artesão", "Data de Criação"],
        rows: items
            .iter()
            .map(|item| {
                vec![
                    item.name.clone(),
                    item.description.clone(),
                    item.category.clone(),
                    item.village.clone(),
                    item.artisan_name.clone(),
                    format_date(item.created_at),
                ]
            })
            .collect(),
    }
}

pub fn artisans_table(artisans: &[Artisan]) -> Table {
    Table {
        columns: vec!["Nome", "Aldeia", "WhatsApp", "Status", "Data de Registro"],
        rows: artisans
            .iter()
            .map(|artisan| {
                let status = if artisan.active { "Ativo" } else { "Inativo" };
                vec![
                    artisan.name.clone(),
                    artisan.village.clone(),
                    artisan.whatsapp.clone(),
                    status.to_string(),
                    format_date(artisan.created_at),
                ]
            })
            .collect(),
    }
}

fn csv_field(value: &str) -> String {
    let needs_quotes = value.contains(DELIMITER)
        || value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Semicolon-separated, BOM-prefixed so spreadsheet tools read it as UTF-8
pub fn to_csv(table: &Table) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(
        table
            .columns
            .iter()
            .map(|column| csv_field(column))
            .collect::<Vec<_>>()
            .join(DELIMITER),
    );
    for row in &table.rows {
        lines.push(row.iter().map(|cell| csv_field(cell)).collect::<Vec<_>>().join(DELIMITER));
    }

    format!("{}{}", BOM, lines.join("\n"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(rename = "artesanatos")]
    pub craft_items: Vec<CraftItem>,

    #[serde(rename = "artesaos")]
    pub artisans: Vec<Artisan>,

    #[serde(rename = "fotos")]
    pub photos: Vec<Photo>,

    #[serde(rename = "categorias")]
    pub categories: Vec<Category>,

    #[serde(rename = "aldeias")]
    pub villages: Vec<Village>,

    #[serde(rename = "configuracoes")]
    pub site_config: Option<SiteConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTotals {
    #[serde(rename = "artesanatos")]
    pub craft_items: usize,

    #[serde(rename = "artesaos")]
    pub artisans: usize,

    #[serde(rename = "fotos")]
    pub photos: usize,

    #[serde(rename = "categorias")]
    pub categories: usize,

    #[serde(rename = "aldeias")]
    pub villages: usize,
}

/// Full database dump with ISO-8601 timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseExport {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub data: ExportData,
    pub totals: ExportTotals,
}

impl DatabaseExport {
    pub async fn collect(catalog: &Catalog) -> Self {
        let (craft_items, artisans, photos, categories, villages, site_config) = tokio::join!(
            catalog.craft_items(),
            catalog.artisans(),
            catalog.photos(),
            catalog.categories(),
            catalog.villages(),
            catalog.site_config(),
        );

        let totals = ExportTotals {
            craft_items: craft_items.len(),
            artisans: artisans.len(),
            photos: photos.len(),
            categories: categories.len(),
            villages: villages.len(),
        };

        Self {
            export_date: Utc::now(),
            version: EXPORT_VERSION.to_string(),
            data: ExportData {
                craft_items,
                artisans,
                photos,
                categories,
                villages,
                site_config,
            },
            totals,
        }
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}

fn centered(line: &str, width: usize) -> String {
    let len = line.chars().count();
    let indent = width.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(indent), line)
}

/// Paginated plain-text report; pages are separated by form feeds and each
/// repeats the institutional header and ends with its page number.
pub fn render_report(title: &str, table: &Table, generated_at: DateTime<Utc>, rows_per_page: usize) -> String {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| {
                    let cell = cell.replace(['\n', '\r'], " ");
                    if cell.trim().is_empty() {
                        "-".to_string()
                    } else {
                        clip(&cell, REPORT_MAX_COLUMN_WIDTH)
                    }
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let header_row = format_row(table.columns.clone());
    let rule = "-".repeat(header_row.chars().count());
    let page_width = INSTITUTIONAL_HEADER
        .iter()
        .map(|line| line.chars().count())
        .chain(std::iter::once(rule.chars().count()))
        .max()
        .unwrap_or(0);

    let per_page = rows_per_page.max(1);
    let chunks: Vec<&[Vec<String>]> = if rows.is_empty() {
        vec![rows.as_slice()]
    } else {
        rows.chunks(per_page).collect()
    };
    let page_count = chunks.len();

    let mut pages = Vec::with_capacity(page_count);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let mut lines: Vec<String> = INSTITUTIONAL_HEADER
            .iter()
            .map(|line| centered(line, page_width))
            .collect();
        lines.push(String::new());
        lines.push(centered(title, page_width));
        lines.push(centered(
            &format!("Data de Geração: {}", format_long_date(generated_at)),
            page_width,
        ));
        lines.push(String::new());
        lines.push(header_row.clone());
        lines.push(rule.clone());
        for row in chunk {
            lines.push(format_row(row.iter().map(String::as_str).collect()));
        }
        lines.push(String::new());
        lines.push(centered(&format!("Página {} de {}", index + 1, page_count), page_width));
        lines.push(centered(REPORT_COPYRIGHT, page_width));
        pages.push(lines.join("\n"));
    }

    pages.join("\n\u{000C}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table(rows: usize) -> Table {
        Table {
            columns: vec!["Nome", "Aldeia"],
            rows: (0..rows)
                .map(|n| vec![format!("Peça {}", n), "Canoanã".to_string()])
                .collect(),
        }
    }

    #[test]
    fn test_csv_quotes_embedded_separators() {
        let table = Table {
            columns: vec!["Nome", "Aldeia"],
            rows: vec![vec!["A, B".to_string(), "X".to_string()]],
        };
        let csv = to_csv(&table);

        assert!(csv.starts_with('\u{FEFF}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{FEFF}').lines().collect();
        assert_eq!(lines, vec!["Nome;Aldeia", "\"A, B\";X"]);
    }

    #[test]
    fn test_csv_escapes_quotes_semicolons_and_newlines() {
        assert_eq!(csv_field("Cocar \"grande\""), "\"Cocar \"\"grande\"\"\"");
        assert_eq!(csv_field("a;b"), "\"a;b\"");
        assert_eq!(csv_field("linha\nnova"), "\"linha\nnova\"");
        assert_eq!(csv_field("simples"), "simples");
    }

    #[test]
    fn test_dates_use_brasilia_time() {
        // 01:30 UTC is still the previous evening in Brasília
        let date = Utc.with_ymd_and_hms(2025, 3, 2, 1, 30, 0).unwrap();
        assert_eq!(format_date(date), "01/03/2025");
        assert_eq!(format_long_date(date), "01 de março de 2025");
    }

    #[test]
    fn test_artisan_status_column() {
        let artisan = Artisan {
            id: "a1".to_string(),
            name: "Juma".to_string(),
            photo_url: String::new(),
            whatsapp: "63999990000".to_string(),
            village: "Canoanã".to_string(),
            bio: None,
            document_url: None,
            active: false,
            created_at: Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap(),
        };
        let table = artisans_table(&[artisan]);
        assert_eq!(table.columns[3], "Status");
        assert_eq!(table.rows[0][3], "Inativo");
        assert_eq!(table.rows[0][4], "10/06/2025");
    }

    #[test]
    fn test_report_paginates_with_footer() {
        let generated = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let report = render_report("RELATÓRIO DE TESTE", &table(25), generated, 10);

        let pages: Vec<&str> = report.split('\u{000C}').collect();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("MINISTÉRIO DA EDUCAÇÃO"));
        assert!(pages[0].contains("Data de Geração: 10 de junho de 2025"));
        assert!(pages[2].contains("Página 3 de 3"));
        assert!(pages[2].contains("Peça 24"));
        assert!(!pages[2].contains("Peça 19"));
    }

    #[test]
    fn test_empty_report_has_one_page() {
        let report = render_report("VAZIO", &table(0), Utc::now(), 10);
        assert!(report.contains("Página 1 de 1"));
        assert!(!report.contains('\u{000C}'));
    }

    #[test]
    fn test_report_fills_blank_cells() {
        let table = Table {
            columns: vec!["Nome", "Aldeia"],
            rows: vec![vec!["Cocar".to_string(), String::new()]],
        };
        let report = render_report("T", &table, Utc::now(), 10);
        assert!(report.lines().any(|line| line == "Cocar | -"));
    }
}
