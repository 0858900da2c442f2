use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
}

impl ColumnDescriptor {
    /// Whether the declared storage type indicates text, which is what makes
    /// a column eligible for categorical value sampling.
    pub fn is_text(&self) -> bool {
        self.declared_type.to_lowercase().contains("text")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn sample_query(&self) -> String {
        format!("SELECT * FROM {} LIMIT 5;", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_text() {
        let text = ColumnDescriptor {
            name: "gene_name".to_string(),
            declared_type: "TEXT".to_string(),
        };
        let real = ColumnDescriptor {
            name: "padj".to_string(),
            declared_type: "REAL".to_string(),
        };
        assert!(text.is_text());
        assert!(!real.is_text());
    }

    #[test]
    fn test_sample_query() {
        let table = TableSchema {
            name: "metadata".to_string(),
            columns: vec![],
        };
        assert_eq!(table.sample_query(), "SELECT * FROM metadata LIMIT 5;");
    }
}
