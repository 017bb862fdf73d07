use karte_core::{finding_node_id, problem_node_id, HypothesisInput};

const BLOCK_SEPARATOR: &str = "\n---\n";

const INSTRUCTIONS_HEAD: &str = "あなたは熟練した理学療法士です。以下の仮説と、それぞれに関連付けられた評価所見のリストを分析し、フローチャートとして構造化してください。\n\n\
提供された各「仮説」に対して、'problem'タイプの親ノードを1つ作成してください。\n\
その仮説に紐づく各「評価所見」について、改行(\\n)で区切られた各行を独立した'finding'タイプの子ノードとして作成し、対応する親（仮説）ノードに接続してください。\n\n\
入力データ:\n---\n";

fn instructions_tail() -> String {
    format!(
        "\n---\n\n\
このフローチャート構造を表すJSONオブジェクトを生成してください。\n\
- JSONには \"nodes\" という単一のキーが含まれている必要があります。\n\
- \"nodes\" は、フローチャート内の各ノードを表すオブジェクトの配列です。\n\
- 各ノードには、一意の 'id' (例: \"{}\", \"{}\")、'label'、'type' ('problem' または 'finding')、そして 'parentId' が必要です。\n\
- 仮説から生成されるノード（'problem' type）の 'parentId' は null にしてください。\n\
- 所見から生成されるノード（'finding' type）には、接続先の仮説ノードの 'id' を 'parentId' として設定してください。",
        problem_node_id(1),
        finding_node_id(1, 1)
    )
}

/// Render one hypothesis block. `index` is 1-based.
fn serialize_hypothesis(out: &mut String, index: usize, h: &HypothesisInput) {
    out.push_str("\n仮説 ");
    out.push_str(&index.to_string());
    out.push_str(": ");
    out.push_str(&h.hypothesis);
    out.push_str("\n関連所見:\n");
    // Findings go through verbatim; the model splits them per line.
    out.push_str(&h.findings);
    out.push('\n');
}

/// Build the extraction prompt for a list of hypotheses. Deterministic.
pub fn flowchart_prompt(hypotheses: &[HypothesisInput]) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(INSTRUCTIONS_HEAD);

    for (i, h) in hypotheses.iter().enumerate() {
        if i > 0 {
            out.push_str(BLOCK_SEPARATOR);
        }
        serialize_hypothesis(&mut out, i + 1, h);
    }

    out.push_str(&instructions_tail());
    out
}
