//! 数据集存储 (Dataset Store)。
//!
//! `DatasetStore` 在进程启动时构建一次，此后只读：特征矩阵、特征名、类别名，
//! 以及构建时一次性算出的每个特征的最小值/最大值。它通过 `Arc` 在连接任务与
//! 工作池线程之间共享，不存在任何写入者，因此读取无需加锁。
//!
//! 数据来源是一个 JSON 文档（见 [`DatasetDocument`]），由 [`load_dataset`] 读取；
//! 文档如何生成（CSV 转换、降维等）不属于本服务的职责。

use dashboard_models::ws_payloads::{RowRecord, LABEL_COLUMN};
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 构建或加载数据集失败的原因。
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("读取数据集文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析数据集文档失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("数据集至少需要一行数据")]
    NoRows,

    #[error("数据集至少需要一个特征")]
    NoFeatures,

    #[error("数据集至少需要一个类别名")]
    NoClasses,

    #[error("第 {row} 行有 {actual} 个特征值，预期 {expected} 个")]
    RaggedRow { row: usize, expected: usize, actual: usize },

    #[error("第 {row} 行的特征 {feature:?} 不是有限数值")]
    NonFiniteValue { row: usize, feature: String },

    #[error("第 {row} 行缺少数值列 {column:?}")]
    MissingColumn { row: usize, column: String },

    #[error("第 {row} 行的类别标签 {label} 超出类别数 {class_count}")]
    InvalidLabel { row: usize, label: u64, class_count: usize },
}

/// 数据集中的一行。
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    /// 与特征名一一对应的特征值。
    pub features: Vec<f64>,
    /// 类别标签（类别名数组中的下标）。
    pub label: Option<usize>,
    /// 与辅助列名一一对应的辅助数值，例如投影坐标。
    pub auxiliary: Vec<f64>,
}

impl DatasetRow {
    pub fn from_features(features: Vec<f64>) -> Self {
        Self { features, label: None, auxiliary: Vec::new() }
    }
}

/// 不可变的数据集及其派生统计量。
#[derive(Debug)]
pub struct DatasetStore {
    feature_names: Vec<String>,
    class_names: Vec<String>,
    auxiliary_names: Vec<String>,
    rows: Vec<DatasetRow>,
    feature_min: Vec<f64>,
    feature_max: Vec<f64>,
}

impl DatasetStore {
    /// 校验并构建数据集，同时计算每个特征的最小值/最大值。
    ///
    /// 要求：至少一行、至少一个特征、至少一个类别名；每行特征数与特征名数一致，
    /// 辅助值个数与辅助列名数一致；所有特征值为有限数；标签小于类别数。
    pub fn new(
        feature_names: Vec<String>,
        class_names: Vec<String>,
        auxiliary_names: Vec<String>,
        rows: Vec<DatasetRow>,
    ) -> Result<Self, DatasetError> {
        if feature_names.is_empty() {
            return Err(DatasetError::NoFeatures);
        }
        if class_names.is_empty() {
            return Err(DatasetError::NoClasses);
        }
        if rows.is_empty() {
            return Err(DatasetError::NoRows);
        }

        let feature_count = feature_names.len();
        let mut feature_min = vec![f64::INFINITY; feature_count];
        let mut feature_max = vec![f64::NEG_INFINITY; feature_count];

        for (row_index, row) in rows.iter().enumerate() {
            if row.features.len() != feature_count {
                return Err(DatasetError::RaggedRow {
                    row: row_index,
                    expected: feature_count,
                    actual: row.features.len(),
                });
            }
            if row.auxiliary.len() != auxiliary_names.len() {
                return Err(DatasetError::RaggedRow {
                    row: row_index,
                    expected: auxiliary_names.len(),
                    actual: row.auxiliary.len(),
                });
            }
            if let Some(label) = row.label {
                if label >= class_names.len() {
                    return Err(DatasetError::InvalidLabel {
                        row: row_index,
                        label: label as u64,
                        class_count: class_names.len(),
                    });
                }
            }
            for (feature, &value) in row.features.iter().enumerate() {
                if !value.is_finite() {
                    return Err(DatasetError::NonFiniteValue {
                        row: row_index,
                        feature: feature_names[feature].clone(),
                    });
                }
                feature_min[feature] = feature_min[feature].min(value);
                feature_max[feature] = feature_max[feature].max(value);
            }
        }

        Ok(Self { feature_names, class_names, auxiliary_names, rows, feature_min, feature_max })
    }

    /// 只有特征矩阵、没有标签和辅助列的数据集。
    pub fn from_matrix(
        feature_names: Vec<String>,
        class_names: Vec<String>,
        matrix: Vec<Vec<f64>>,
    ) -> Result<Self, DatasetError> {
        let rows = matrix.into_iter().map(DatasetRow::from_features).collect();
        Self::new(feature_names, class_names, Vec::new(), rows)
    }

    /// 从已解析的数据集文档构建。
    pub fn from_document(document: DatasetDocument) -> Result<Self, DatasetError> {
        let DatasetDocument { feature_names, class_names, records } = document;

        // 辅助列取自第一条记录中除特征列和标签列以外的数值列
        let auxiliary_names: Vec<String> = records
            .first()
            .map(|first| {
                first
                    .iter()
                    .filter(|(name, value)| {
                        value.is_number()
                            && name.as_str() != LABEL_COLUMN
                            && !feature_names.iter().any(|feature| feature == *name)
                    })
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(records.len());
        for (row_index, record) in records.iter().enumerate() {
            let features = numeric_columns(record, &feature_names, row_index)?;
            let auxiliary = numeric_columns(record, &auxiliary_names, row_index)?;
            let label = match record.get(LABEL_COLUMN) {
                None | Some(Value::Null) => None,
                Some(value) => {
                    let label = value.as_u64().ok_or_else(|| DatasetError::MissingColumn {
                        row: row_index,
                        column: LABEL_COLUMN.to_string(),
                    })?;
                    // 超出 usize 的标签必然超出类别数
                    Some(usize::try_from(label).map_err(|_| DatasetError::InvalidLabel {
                        row: row_index,
                        label,
                        class_count: class_names.len(),
                    })?)
                }
            };
            rows.push(DatasetRow { features, label, auxiliary });
        }

        Self::new(feature_names, class_names, auxiliary_names, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn auxiliary_names(&self) -> &[String] {
        &self.auxiliary_names
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&DatasetRow> {
        self.rows.get(index)
    }

    /// 每个特征在全部行上的最小值。
    pub fn feature_min(&self) -> &[f64] {
        &self.feature_min
    }

    /// 每个特征在全部行上的最大值。
    pub fn feature_max(&self) -> &[f64] {
        &self.feature_max
    }

    /// 按行顺序返回每一行的记录视图。
    pub fn records(&self) -> impl Iterator<Item = RowRecord<'_>> + '_ {
        self.rows.iter().map(move |row| RowRecord {
            feature_names: &self.feature_names,
            features: &row.features,
            label: row.label,
            auxiliary_names: &self.auxiliary_names,
            auxiliary: &row.auxiliary,
        })
    }
}

fn numeric_columns(record: &Map<String, Value>, columns: &[String], row: usize) -> Result<Vec<f64>, DatasetError> {
    columns
        .iter()
        .map(|column| {
            record
                .get(column)
                .and_then(Value::as_f64)
                .ok_or_else(|| DatasetError::MissingColumn { row, column: column.clone() })
        })
        .collect()
}

/// 数据集 JSON 文档。
///
/// ```json
/// {
///   "featureNames": ["alcohol", "malic_acid"],
///   "classNames": ["class_0", "class_1"],
///   "records": [{"alcohol": 14.23, "malic_acid": 1.71, "label": 0, "tsne_1": 3.1}]
/// }
/// ```
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDocument {
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
    pub records: Vec<Map<String, Value>>,
}

/// 从文件读取数据集文档并构建 `DatasetStore`。
pub fn load_dataset(path: &Path) -> Result<DatasetStore, DatasetError> {
    let content = fs::read_to_string(path).map_err(|source| DatasetError::Io { path: path.to_path_buf(), source })?;
    let document: DatasetDocument = serde_json::from_str(&content)?;
    let store = DatasetStore::from_document(document)?;
    info!(
        "[数据集] 已从 {:?} 加载数据集：{} 行，{} 个特征，{} 个类别，辅助列 {:?}",
        path,
        store.row_count(),
        store.feature_count(),
        store.class_names().len(),
        store.auxiliary_names()
    );
    Ok(store)
}
