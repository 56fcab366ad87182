//! Prompt templates for the three research primitives
//!
//! Every rendered prompt is part of the oracle cache key, so any wording
//! change here naturally invalidates previously cached answers.

use crate::types::PageAnalysis;

pub fn expand_keywords_system(count: usize, translation_language: &str) -> String {
    format!(
        r#"# Task
Analyze the user's input and respond with JSON only. No comments or explanations.

1. Infer anything the user left implicit and restate the input as a complete question.
2. Propose {count} search keyword phrases (including rephrasings) likely to lead to an answer.
3. Translate each of those search phrases into {translation_language}.

# Output format
```json
{{
"full_question": "question",
"search_keywords": ["search phrase 1", "search phrase 2"],
"translated_keywords": ["search phrase 1", "search phrase 2"]
}}
```"#
    )
}

pub fn analyze_page_system(
    question: &str,
    keyword: &str,
    url: &str,
    article: &str,
    count: usize,
) -> String {
    format!(
        r#"A search for the question below found this article.

1. Rate how relevant the article is to the question and the related keyword, from 0 to 10.
2. List up to {count} keywords worth researching next to answer the question, highest priority first.
3. List up to {count} links from the article worth following, highest priority first.
4. Quote passages from the article that help answer the question. Quote as much as is useful.

Respond with JSON only. No comments or explanations.

```json
{{"relevance": 0,
"follow_up_links": ["https://...", "https://..."],
"follow_up_keywords": ["keyword 1", "keyword 2"],
"excerpts": ["passage 1", "passage 2", "passage 3"]
}}
```

Question:
```question
{question}
```

Related keyword:
```question
{keyword}
```

Article:
```article
URL: {url}
{article}
```"#
    )
}

pub fn synthesize_answer_user(question: &str, articles: &[PageAnalysis]) -> String {
    let mut sources = String::new();
    for article in articles {
        sources.push_str(&format!("URL: {}\n", article.source_url));
        for excerpt in &article.excerpts {
            sources.push_str(&format!("- {}\n", excerpt.trim()));
        }
        sources.push('\n');
    }

    format!(
        r#"A search for the question below found these articles.

Read the question and the article excerpts carefully, weigh how relevant each one is, and write a detailed answer.
Cite the URL of every article you draw on.

Question:
{question}

Articles:
{sources}"#
    )
}
