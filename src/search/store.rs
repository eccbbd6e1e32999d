use std::path::Path;

use anyhow::{Context, Result};
use tantivy::schema::*;
use tantivy::{Index, IndexWriter, doc};

use crate::model::TabRecord;

#[derive(Clone, Copy)]
pub struct Fields {
    pub tab_id: Field,
    pub title: Field,
    pub url: Field,
    pub text: Field,
}

/// Writable search store. Created fresh on every index run: rebuilds
/// replace the previous contents wholesale.
pub struct TabStore {
    pub index: Index,
    writer: IndexWriter,
    pub fields: Fields,
}

impl TabStore {
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_dir_all(path)
                .with_context(|| format!("clear previous store at {}", path.display()))?;
        }
        std::fs::create_dir_all(path)
            .with_context(|| format!("create store directory {}", path.display()))?;

        let schema = build_schema();
        let index = Index::create_in_dir(path, schema.clone())
            .with_context(|| format!("create search store at {}", path.display()))?;
        let writer = index
            .writer(50_000_000)
            .with_context(|| "create index writer")?;
        let fields = fields_from_schema(&schema)?;

        Ok(Self {
            index,
            writer,
            fields,
        })
    }

    pub fn add_record(&mut self, record: &TabRecord) -> Result<()> {
        let d = doc! {
            self.fields.tab_id => record.address.to_string(),
            self.fields.title => record.title.clone(),
            self.fields.url => record.url.clone(),
            self.fields.text => record.text.clone().unwrap_or_default(),
        };
        self.writer.add_document(d)?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        Ok(())
    }
}

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("tab_id", STRING | STORED);
    schema_builder.add_text_field("title", TEXT | STORED);
    schema_builder.add_text_field("url", STORED);
    schema_builder.add_text_field("text", TEXT | STORED);
    schema_builder.build()
}

pub fn fields_from_schema(schema: &Schema) -> Result<Fields> {
    Ok(Fields {
        tab_id: schema
            .get_field("tab_id")
            .map_err(|_| anyhow::anyhow!("schema missing tab_id"))?,
        title: schema
            .get_field("title")
            .map_err(|_| anyhow::anyhow!("schema missing title"))?,
        url: schema
            .get_field("url")
            .map_err(|_| anyhow::anyhow!("schema missing url"))?,
        text: schema
            .get_field("text")
            .map_err(|_| anyhow::anyhow!("schema missing text"))?,
    })
}
