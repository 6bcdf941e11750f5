use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    /// Body carried a `columns` array of `{name, values}` objects
    Columnar(Vec<Column>),
    /// Anything else; only the raw body is available
    Unstructured,
}

#[derive(Deserialize)]
struct ColumnarBody {
    columns: Vec<Column>,
}

/// A decoded response body, kept verbatim alongside its interpreted shape.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    raw: Value,
    shape: ResultShape,
}

impl QueryResult {
    pub fn from_value(raw: Value) -> Self {
        let shape = match ColumnarBody::deserialize(&raw) {
            Ok(body) => ResultShape::Columnar(body.columns),
            Err(e) => {
                log::debug!("response has no usable columns: {}", e);
                ResultShape::Unstructured
            }
        };

        Self { raw, shape }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }

    pub fn columns(&self) -> &[Column] {
        match &self.shape {
            ResultShape::Columnar(columns) => columns,
            ResultShape::Unstructured => &[],
        }
    }
}
