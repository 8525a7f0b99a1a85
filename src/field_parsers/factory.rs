use super::{
    BooleanFieldParser, DateFieldParser, DoubleFieldParser, FieldParser, IntegerFieldParser,
    LongFieldParser, StringFieldParser,
};
use crate::config::{DataType, RepositoryFieldConfig};
use crate::error::ConfigError;

/// Picks the field parser for a field's declared data type.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldParserFactory;

impl FieldParserFactory {
    pub fn get_parser(field: &RepositoryFieldConfig) -> Result<Box<dyn FieldParser>, ConfigError> {
        let parser: Box<dyn FieldParser> = match field.data_type {
            DataType::String => Box::new(StringFieldParser::new(field)?),
            DataType::Integer => Box::new(IntegerFieldParser::new(field)?),
            DataType::Long => Box::new(LongFieldParser::new(field)?),
            DataType::Double => Box::new(DoubleFieldParser::new(field)?),
            DataType::Boolean => Box::new(BooleanFieldParser::new(field)?),
            DataType::Date => Box::new(DateFieldParser::new(field)?),
        };
        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_data_type() {
        for data_type in [
            DataType::String,
            DataType::Integer,
            DataType::Long,
            DataType::Double,
            DataType::Boolean,
            DataType::Date,
        ] {
            let field = RepositoryFieldConfig::new("f", data_type);
            let parser = FieldParserFactory::get_parser(&field).unwrap();
            assert_eq!(parser.data_type(), data_type);
            assert_eq!(parser.field_name(), "f");
        }
    }
}
