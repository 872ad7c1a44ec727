use crate::domain::csv::Dataset;
use crate::domain::error::Result;
use crate::infrastructure::csv::write_csv;

pub(crate) fn build_system_prompt(dataset: &Dataset, max_rows: usize) -> Result<String> {
    let mut body = String::new();
    body.push_str(
        "You are a data analyst. Answer questions about the table below, which was uploaded by the user as a CSV file. \
         Base every answer only on the table. Compute exact values where the question asks for them. \
         If the table does not contain the information, say so. \
         Reply with the answer only, on a line starting with \"Final Answer:\".\n\n",
    );

    body.push_str(&format!(
        "The table has {} rows and {} columns.\n",
        dataset.row_count(),
        dataset.column_count()
    ));
    body.push_str(&format!("Columns: {}\n", dataset.headers().join(", ")));

    let shown = dataset.row_count().min(max_rows);
    if shown < dataset.row_count() {
        body.push_str(&format!(
            "Only the first {} of {} rows are included below; say when an answer depends on the rows that are left out.\n",
            shown,
            dataset.row_count()
        ));
    }

    body.push_str("\nTable (CSV):\n");
    body.push_str(&write_csv(dataset, max_rows)?);

    Ok(body)
}

pub(crate) fn build_user_prompt(question: &str) -> String {
    format!("Question: {}", question.trim())
}
