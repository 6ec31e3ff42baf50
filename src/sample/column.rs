use crate::field::FieldKind;
use crate::error::{ModelError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name : String,
    content : ColumnContent
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnContent {
    Numeric(Vec<f64>),
    Text(Vec<String>),
    Binary(Vec<Vec<u8>>)
}

impl ColumnContent {

    /// Recovers content as numeric. If content is not numeric, try to parse it
    /// from the Text variant. Always fail at binary variant.
    pub fn as_dbl_vec(&self) -> Result<Vec<f64>> {
        match &self {
            ColumnContent::Text(col) => {
                let mut data = Vec::with_capacity(col.len());
                for s in col.iter() {
                    match s.trim().parse::<f64>() {
                        Ok(d) => data.push(d),
                        Err(_) => return Err(ModelError::UnsupportedDtype(format!("'{}' is not a number", s)))
                    }
                }
                Ok(data)
            }
            ColumnContent::Numeric(n) => Ok(n.clone()),
            ColumnContent::Binary(_) => {
                Err(ModelError::UnsupportedDtype("binary column".to_string()))
            }
        }
    }

}

impl<'a> Column {

    /// Try to parse v as f64. Falls back to text if any entry is not a number.
    pub fn from_vec_try_num(name : String, v : Vec<String>) -> Self {
        let col = ColumnContent::Text(v);
        match col.as_dbl_vec() {
            Ok(n) => Self { name, content : ColumnContent::Numeric(n) },
            Err(_) => Self { name, content : col }
        }
    }

    /// Builds as a numeric variant.
    pub fn new_num(name : &str, data : Vec<f64>) -> Self {
        Column { name : name.to_string(), content : ColumnContent::Numeric(data) }
    }

    /// Builds as a text variant.
    pub fn new_text<S>(name : &str, data : impl IntoIterator<Item=S>) -> Self
    where
        S : Into<String>
    {
        Column { name : name.to_string(), content : ColumnContent::Text(data.into_iter().map(|s| s.into() ).collect()) }
    }

    pub fn new_binary(name : &str, data : Vec<Vec<u8>>) -> Self {
        Column { name : name.to_string(), content : ColumnContent::Binary(data) }
    }

    pub fn content(&self) -> &ColumnContent {
        &self.content
    }

    /// Kind of the field this column trains. Text columns are categorical and numeric
    /// columns numerical. Binary columns have no field counterpart.
    pub fn kind(&self) -> Result<FieldKind> {
        match &self.content {
            ColumnContent::Text(_) => Ok(FieldKind::Categorical),
            ColumnContent::Numeric(_) => Ok(FieldKind::Numerical),
            ColumnContent::Binary(_) => Err(ModelError::UnsupportedDtype(format!("binary column '{}'", self.name)))
        }
    }

    /// Get content as f64 if it is numeric. Return None otherwise.
    pub fn get_if_numeric(&self) -> Option<Vec<f64>> {
        match &self.content {
            ColumnContent::Numeric(n) => Some(n.clone()),
            _ => None
        }
    }

    /// Returns the length of the column irrespective of the content.
    pub fn len(&self) -> usize {
        match &self.content {
            ColumnContent::Text(c) => c.len(),
            ColumnContent::Numeric(c) => c.len(),
            ColumnContent::Binary(c) => c.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over a column if it contains textual content; Returns None otherwise.
    pub fn text_iter(&'a self) -> Option<impl Iterator<Item=&'a str>> {
        match &self.content {
            ColumnContent::Text(tc) => {
                Some(tc.iter().map(|s| &s[..] ))
            },
            _ => None
        }
    }

}

#[test]
fn textual_numbers_are_parsed() {
    let c = Column::from_vec_try_num("x".to_string(), vec!["1.5".to_string(), " 2".to_string()]);
    assert_eq!(c.get_if_numeric(), Some(vec![1.5, 2.0]));
    assert_eq!(c.kind().unwrap(), FieldKind::Numerical);
    let t = Column::from_vec_try_num("y".to_string(), vec!["1.5".to_string(), "a".to_string()]);
    assert_eq!(t.kind().unwrap(), FieldKind::Categorical);
    assert!(Column::new_binary("z", vec![vec![0u8]]).kind().is_err());
}
