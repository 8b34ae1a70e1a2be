//! Built-in question templates and review rubrics.

/// Template for single-answer questions.
pub const SINGLE_ANSWER_TEMPLATE: &str = r#"{
  "type": "single_answer",
  "context": "Texto de contextualização...",
  "statement": "Enunciado da questão...",
  "alternatives": [
    {"id": "a", "text": "Alternativa A", "correct": true},
    {"id": "b", "text": "Alternativa B", "correct": false},
    {"id": "c", "text": "Alternativa C", "correct": false},
    {"id": "d", "text": "Alternativa D", "correct": false},
    {"id": "e", "text": "Alternativa E", "correct": false}
  ],
  "feedback": {
    "a": "Correta. Justificativa para A...",
    "b": "Incorreta. Justificativa para B...",
    "c": "Incorreta. Justificativa para C...",
    "d": "Incorreta. Justificativa para D...",
    "e": "Incorreta. Justificativa para E..."
  }
}"#;

/// Template for multiple-answer questions (four assertions, five combinations).
pub const MULTIPLE_ANSWER_TEMPLATE: &str = r#"{
  "type": "multiple_answer",
  "context": "Texto de contextualização...",
  "statement": "Enunciado da questão...",
  "assertions": [
    {"id": "I", "text": "Afirmativa I", "correct": true},
    {"id": "II", "text": "Afirmativa II", "correct": false},
    {"id": "III", "text": "Afirmativa III", "correct": true},
    {"id": "IV", "text": "Afirmativa IV", "correct": false}
  ],
  "alternatives": [
    {"id": "a", "text": "I e III", "correct": true},
    {"id": "b", "text": "II e IV", "correct": false},
    {"id": "c", "text": "I, II e III", "correct": false},
    {"id": "d", "text": "II, III e IV", "correct": false},
    {"id": "e", "text": "I, II, III e IV", "correct": false}
  ],
  "feedback": {
    "a": "Correta. Justificativa para A...",
    "b": "Incorreta. Justificativa para B...",
    "c": "Incorreta. Justificativa para C...",
    "d": "Incorreta. Justificativa para D...",
    "e": "Incorreta. Justificativa para E..."
  }
}"#;

/// Template for assertion-reason questions.
pub const ASSERTION_REASON_TEMPLATE: &str = r#"{
  "type": "assertion_reason",
  "context": "Texto de contextualização...",
  "statement": "Avalie as asserções a seguir e a relação proposta entre elas.",
  "assertions": [
    {"id": "I", "text": "Asserção I", "correct": true},
    {"id": "II", "text": "Asserção II", "correct": true}
  ],
  "alternatives": [
    {"id": "a", "text": "As asserções I e II são proposições verdadeiras, e a II é uma justificativa correta da I.", "correct": false},
    {"id": "b", "text": "As asserções I e II são proposições verdadeiras, mas a II não é uma justificativa correta da I.", "correct": true},
    {"id": "c", "text": "A asserção I é uma proposição verdadeira, e a II é uma proposição falsa.", "correct": false},
    {"id": "d", "text": "A asserção I é uma proposição falsa, e a II é uma proposição verdadeira.", "correct": false},
    {"id": "e", "text": "As asserções I e II são proposições falsas.", "correct": false}
  ],
  "feedback": {
    "a": "Incorreta. Justificativa para A...",
    "b": "Correta. Justificativa para B...",
    "c": "Incorreta. Justificativa para C...",
    "d": "Incorreta. Justificativa para D...",
    "e": "Incorreta. Justificativa para E..."
  }
}"#;

pub const RT_RUBRIC_TITLE: &str = "CHECKLIST – REVISOR TÉCNICO";

/// Technical-review criteria.
pub const RT_RUBRIC: [&str; 8] = [
    "As questões abordam os conteúdos tratados nas UAs/Etapas/Aulas correspondentes?",
    "Os objetivos de aprendizagem indicados nos grupos correspondem aos definidos no PAA?",
    "Todas as questões de um grupo permitem avaliar a aprendizagem a partir do(s) objetivo(s) associado(s)? (máximo 2 objetivos).",
    "Há correlação entre os conteúdos desenvolvidos nas UAs/Etapas/Aulas e as questões?",
    "O nível de complexidade das questões é coerente com os conteúdos propostos nas UAs/Etapas/Aulas correspondentes?",
    "Os feedbacks das questões justificam o porquê do acerto ou erro de forma clara e precisa?",
    "O texto-base/enunciado está claro e sem ambiguidades?",
    "As questões não avaliam conteúdos memorizados?",
];

pub const DE_RUBRIC_TITLE: &str = "CHECKLIST – DESIGN EDUCACIONAL";

/// Design-review criteria.
pub const DE_RUBRIC: [&str; 15] = [
    "As questões abordam os conteúdos tratados nas UAs/Etapas/Aulas correspondentes?",
    "Os objetivos de aprendizagem indicados nos grupos correspondem aos definidos no PAA?",
    "Todas as questões de um grupo permitem avaliar a aprendizagem a partir do(s) objetivo(s) associado(s)? (máximo 2 objetivos).",
    "Há correlação entre os conteúdos desenvolvidos nas UAs/Etapas/Aulas e as questões?",
    "O texto-base/enunciado está claro e sem ambiguidades?",
    "O texto-base/enunciado dá suporte para a resolução da questão?",
    "Os feedbacks das questões justificam o porquê do acerto ou erro de forma clara e precisa?",
    "Há indicação de referência nos textos de suporte, seja autoral ou de curadoria?",
    "Nenhum comando solicita assinalar a alternativa incorreta?",
    "As questões não avaliam conteúdos memorizados?",
    "As questões não apresentam alternativas com \"todas as afirmativas estão erradas/incorretas\"?",
    "As questões apresentam alternativas com extensão semelhante?",
    "As questões não apresentam elementos que tornem a afirmação falsa, como: \"apenas\", \"somente\", \"nunca\", etc.?",
    "Todas as afirmativas iniciam com palavras da mesma classe gramatical?",
    "Cada item avaliativo contempla 5 alternativas de resposta?",
];
