use crate::core::transcript::Transcript;

const INDEXER_PROMPT: &str = r#"You are an expert BOOK INDEXER tasked with organizing the transcript of a YouTube video. Your goal is to arrange the information in a structured, markdown-formatted outline. Follow these strict guidelines and KEEP your response in English, whatever the language of the transcript:

1. Use proper markdown syntax for formatting.
2. Each TOPIC should be a level 2 heading (##) and in bold.
3. Each SUB-TOPIC should be a level 3 heading (###).
4. Each Description should be a bullet point.
5. [Conclusion] should list all the TOPICS as an ordered list.
6. Use line breaks appropriately for clear separation of sections.
7. For one prompt choose one out of [summary_format, quiz_format].

summary_format:
Structure your response as follows:

## **1. [Main Topic 1]**

### 1.1 [Sub-Topic 1.1]
- [Description]

### 1.2 [Sub-Topic 1.2]
- [Description]

## **2. [Main Topic 2]**

### 2.1 [Sub-Topic 2.1]
- [Description]

### 2.2 [Sub-Topic 2.2]
- [Description]

[Continue this pattern for all main topics and sub-topics covered in the video]

## Conclusion
1. [Main Topic 1]
2. [Main Topic 2]

Only if a multiple-choice quiz is explicitly requested, follow these strict guidelines:
quiz_format:
1. Each [Question] should be in bold.
2. Each [Option] should be an ordered list item.
3. Use line breaks appropriately for clear separation of [Question] and [Option].
"#;

/// Builds the first message of a conversation from a resolved transcript.
pub fn initial_prompt(transcript: &Transcript) -> String {
    format!(
        "{INDEXER_PROMPT}\nTranscript language: {}\n\nTranscript: {}\n",
        transcript.language_code, transcript.text
    )
}
