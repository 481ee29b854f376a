/// Arrow table representation of merged rows (the results "table view").
pub mod merged {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Builder, ListBuilder, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::export::format_top_k;
    use crate::record::MergedRecord;

    /// Schema for merged annotation rows.
    pub fn merged_rows_schema() -> Schema {
        Schema::new(vec![
            Field::new(
                "merged_ids",
                DataType::List(Arc::new(Field::new("item", DataType::Int64, true))),
                false,
            ),
            Field::new("label", DataType::Utf8, false),
            Field::new("source_text", DataType::Utf8, false),
            Field::new("confidence", DataType::Float64, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("sub_category", DataType::Utf8, false),
            Field::new("fine_grained", DataType::Utf8, false),
            Field::new("rating", DataType::Utf8, false),
            Field::new("action", DataType::Utf8, false),
            Field::new("top_k", DataType::Utf8, false),
        ])
    }

    /// Build a single RecordBatch from merged rows, in row order.
    pub fn to_record_batch(rows: &[MergedRecord]) -> Result<RecordBatch, ArrowError> {
        let mut ids_builder = ListBuilder::new(Int64Builder::new());
        for row in rows {
            ids_builder.values().append_slice(&row.merged_ids);
            ids_builder.append(true);
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(ids_builder.finish()),
            utf8_column(rows.iter().map(|r| r.record.label.as_str())),
            utf8_column(rows.iter().map(|r| r.record.text.as_str())),
            Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.record.confidence),
            )),
            utf8_column(rows.iter().map(|r| r.record.category.as_str())),
            utf8_column(rows.iter().map(|r| r.record.sub_category.as_str())),
            utf8_column(rows.iter().map(|r| r.record.fine_grained.as_str())),
            utf8_column(rows.iter().map(|r| r.record.rating.as_str())),
            utf8_column(rows.iter().map(|r| r.record.action.as_str())),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| format_top_k(&r.record.top_k)),
            )),
        ];

        RecordBatch::try_new(Arc::new(merged_rows_schema()), columns)
    }

    fn utf8_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
        Arc::new(StringArray::from_iter_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::merged;
    use crate::record::{MergedRecord, SentenceRecord, TopK};
    use arrow::array::{Array, Float64Array, ListArray, StringArray};

    fn row(ids: &[i64], label: &str) -> MergedRecord {
        MergedRecord {
            record: SentenceRecord {
                id: ids[0],
                text: "text".into(),
                label: label.into(),
                confidence: 0.75,
                category: "Data Security".into(),
                sub_category: String::new(),
                fine_grained: String::new(),
                rating: "good".into(),
                action: String::new(),
                top_k: vec![TopK {
                    label: label.into(),
                    prob: 0.5,
                }],
            },
            merged_ids: ids.to_vec(),
        }
    }

    #[test]
    fn merged_rows_schema_has_expected_fields() {
        let schema = merged::merged_rows_schema();
        assert_eq!(schema.fields().len(), 10);
        assert!(schema.field_with_name("merged_ids").is_ok());
        assert!(schema.field_with_name("top_k").is_ok());
    }

    #[test]
    fn builds_batch_in_row_order() {
        let batch = merged::to_record_batch(&[row(&[1, 2], "a"), row(&[4], "b")]).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let labels = batch
            .column_by_name("label")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(labels.value(0), "a");
        assert_eq!(labels.value(1), "b");

        let ids = batch
            .column_by_name("merged_ids")
            .unwrap()
            .as_any()
            .downcast_ref::<ListArray>()
            .unwrap();
        assert_eq!(ids.value(0).len(), 2);
        assert_eq!(ids.value(1).len(), 1);

        let conf = batch
            .column_by_name("confidence")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(conf.value(0), 0.75);

        let top_k = batch
            .column_by_name("top_k")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(top_k.value(1), "b (50.0%)");
    }

    #[test]
    fn empty_rows_build_empty_batch() {
        let batch = merged::to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 10);
    }
}
